#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub const SALES_CSV: &str = "\
Product,Price,Qty,Sold At
  Café molido ,$120.40,2,2024-03-01 08:15:00
LAPTOP,$1500,1,2024-03-02 13:45:00
mouse,$25,4,2024-03-03 19:05:00
";

pub fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tabkit"))
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> TestResult<PathBuf> {
    if let Some(parent) = dir.join(name).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

pub fn write_sales(dir: &Path) -> TestResult<PathBuf> {
    write_file(dir, "sales.csv", SALES_CSV)
}

pub fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
