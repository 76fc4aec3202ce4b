pub mod csv_io;
pub mod error;
pub mod report_io;
pub mod results_file;

pub use csv_io::{read_table, write_records, write_table, Table, TableRow};
pub use error::{IoError, IoResult};
pub use report_io::{load_json, save_json};
pub use results_file::{parse_results, read_results_file, write_results};
