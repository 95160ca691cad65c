// src/load/schema.rs

/// Target table for the registration extract.
pub const TABLE_NAME: &str = "electric_vehicles";

/// One table column and the CSV header it is loaded from.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub struct Column {
    pub csv_header: &'static str,
    pub name: &'static str,
    pub ty: &'static str,
}

const fn col(csv_header: &'static str, name: &'static str, ty: &'static str) -> Column {
    Column {
        csv_header,
        name,
        ty,
    }
}

/// Header → column mapping, in table order.
pub const COLUMNS: [Column; 17] = [
    col("VIN (1-10)", "VIN", "VARCHAR"),
    col("County", "County", "VARCHAR"),
    col("City", "City", "VARCHAR"),
    col("State", "State", "VARCHAR"),
    col("Postal Code", "Postal_Code", "VARCHAR"),
    col("Model Year", "Model_Year", "INTEGER"),
    col("Make", "Make", "VARCHAR"),
    col("Model", "Model", "VARCHAR"),
    col("Electric Vehicle Type", "Electric_Vehicle_Type", "VARCHAR"),
    col(
        "Clean Alternative Fuel Vehicle (CAFV) Eligibility",
        "CAFV_Eligibility",
        "VARCHAR",
    ),
    col("Electric Range", "Electric_Range", "INTEGER"),
    col("Base MSRP", "Base_MSRP", "INTEGER"),
    col("Legislative District", "Legislative_District", "VARCHAR"),
    col("DOL Vehicle ID", "DOL_Vehicle_ID", "BIGINT"),
    col("Vehicle Location", "Vehicle_Location", "VARCHAR"),
    col("Electric Utility", "Electric_Utility", "VARCHAR"),
    col("2020 Census Tract", "Census_Tract", "VARCHAR"),
];

/// `CREATE TABLE IF NOT EXISTS` statement built from [`COLUMNS`].
pub fn create_table_sql() -> String {
    let cols: Vec<String> = COLUMNS
        .iter()
        .map(|c| format!("    {} {}", c.name, c.ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        TABLE_NAME,
        cols.join(",\n")
    )
}
