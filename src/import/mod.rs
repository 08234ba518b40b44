mod csv_reader;
mod ganjoor_csv;

pub use csv_reader::{CsvRecords, CsvRow, CsvTable};
pub use ganjoor_csv::{import_files, ArchiveImporter, ImportFiles, ImportReport, DEFAULT_BATCH_SIZE};
