mod column_count;
mod column_def;
mod eof;
mod err;
mod local_infile;
mod ok;
mod row;

pub use column_count::ColumnCount;
pub use column_def::ColumnDefinition;
pub use eof::EofPacket;
pub use err::ErrPacket;
pub use local_infile::LocalInfileRequest;
pub use ok::OkPacket;
pub use row::Row;
