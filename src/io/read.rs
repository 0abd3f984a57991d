//! CSV input: tabular data with named columns, no other format assumptions.

use std::path::Path;

use crate::data::DataTable;

use super::IoError;

/// Read a headered CSV file into a [`DataTable`].
///
/// Values stay untyped; consumers ask the table for typed views.
///
/// # Errors
///
/// Returns [`IoError`] on filesystem or CSV parse problems, or when the
/// file has no rows.
pub fn read_table(path: &Path) -> Result<DataTable, IoError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, field) in record.iter().enumerate() {
            if i < columns.len() {
                columns[i].push(field.to_string());
            }
        }
    }
    Ok(DataTable::new(headers, columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_headers_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "sex,age,time,event").unwrap();
        writeln!(file, "m,40,5.0,0").unwrap();
        writeln!(file, "f,50,2.5,1").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column("sex").unwrap(), &["m".to_string(), "f".to_string()]);
        assert_eq!(table.numeric_column("time").unwrap(), vec![5.0, 2.5]);
    }

    #[test]
    fn empty_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::File::create(&path).unwrap();
        assert!(read_table(&path).is_err());
    }
}
