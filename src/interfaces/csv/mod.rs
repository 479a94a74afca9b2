pub mod event_reader;
pub mod manifest_writer;
