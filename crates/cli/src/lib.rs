// plugtable CLI library: table assembly and rendering shared by the binary and its tests

pub mod app;
pub mod output;
pub mod row_query;
