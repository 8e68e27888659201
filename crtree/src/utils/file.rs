pub mod itemreader;
pub mod tell;
