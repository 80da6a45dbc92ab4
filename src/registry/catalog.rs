//! Built-in catalog of the application tables

use crate::types::ColumnType::{Boolean, Date, Decimal, Integer, LongText, Text};
use crate::types::{ColumnSpec, TableSchema};

/// Table ids in the order the application lists them
pub const BUILTIN_TABLE_IDS: [&str; 7] = [
    "productos",
    "caja",
    "pacientes",
    "usuarios",
    "mascotas",
    "facturas",
    "detalle_factura",
];

pub fn builtin_schemas() -> Vec<TableSchema> {
    vec![
        TableSchema::new(
            "productos",
            "Productos",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("nombre", Text),
                ColumnSpec::optional("descripcion", LongText),
                ColumnSpec::required("precio_costo", Decimal),
                ColumnSpec::optional("precio_venta", Decimal),
                ColumnSpec::required("stock", Integer),
                ColumnSpec::optional("activo", Boolean),
                ColumnSpec::optional("fecha_vencimiento", Date),
            ],
        )
        .with_aliases(&["Inventario"]),
        TableSchema::new(
            "caja",
            "Caja",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("fecha", Date),
                ColumnSpec::required("concepto", Text),
                ColumnSpec::required("tipo", Text),
                ColumnSpec::required("monto", Decimal),
                ColumnSpec::optional("observaciones", LongText),
            ],
        )
        .with_aliases(&["Movimientos de caja"]),
        TableSchema::new(
            "pacientes",
            "Pacientes",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("nombre", Text),
                ColumnSpec::optional("apellido", Text),
                ColumnSpec::required("documento", Text),
                ColumnSpec::optional("telefono", Text),
                ColumnSpec::optional("email", Text),
                ColumnSpec::optional("direccion", LongText),
                ColumnSpec::optional("fecha_registro", Date),
            ],
        )
        .with_aliases(&["Clientes"]),
        TableSchema::new(
            "usuarios",
            "Usuarios",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("usuario", Text),
                ColumnSpec::required("nombre", Text),
                ColumnSpec::optional("email", Text),
                ColumnSpec::required("rol", Text),
                ColumnSpec::optional("activo", Boolean),
            ],
        ),
        TableSchema::new(
            "mascotas",
            "Mascotas",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("nombre", Text),
                ColumnSpec::required("especie", Text),
                ColumnSpec::optional("raza", Text),
                ColumnSpec::optional("fecha_nacimiento", Date),
                ColumnSpec::required("paciente_id", Integer),
                ColumnSpec::optional("observaciones", LongText),
            ],
        ),
        TableSchema::new(
            "facturas",
            "Facturas",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("numero", Text),
                ColumnSpec::required("fecha", Date),
                ColumnSpec::optional("paciente_id", Integer),
                ColumnSpec::required("total", Decimal),
                ColumnSpec::optional("pagada", Boolean),
            ],
        ),
        TableSchema::new(
            "detalle_factura",
            "Detalle Factura",
            "id",
            vec![
                ColumnSpec::optional("id", Integer),
                ColumnSpec::required("factura_id", Integer),
                ColumnSpec::required("producto_id", Integer),
                ColumnSpec::required("cantidad", Integer),
                ColumnSpec::required("precio_unitario", Decimal),
                ColumnSpec::optional("subtotal", Decimal),
            ],
        ),
    ]
}
