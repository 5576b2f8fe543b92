pub mod card_reader;
pub mod report_writer;
