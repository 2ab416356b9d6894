#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Messy order export: accented names, currency strings, mixed date
/// layouts, an all-empty row and one extreme quantity.
pub const ORDERS_CSV: &str = "\
Customer Name,Unit Price,Qty,Order Date,Contact
  josé  pérez!!,$12.50,2,2024-01-05,mail: jose@shop.mx
MARÍA lópez,$8,3,01/20/2024,maria@shop.mx
ana,n/a,1,bad date,none
,,,,
luis,$4,400,2024-02-10,luis@shop.mx
carla,$10,4,2024-02-11 09:30:00,carla@shop.mx
";

pub fn write_file(dir: &Path, name: &str, contents: &str) -> TestResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

pub fn write_orders(dir: &Path) -> TestResult<PathBuf> {
    write_file(dir, "orders.csv", ORDERS_CSV)
}
