mod com_stmt_close;
mod com_stmt_execute;
mod com_stmt_fetch;
mod com_stmt_prepare;
mod prepare_ok;

pub use com_stmt_close::ComStmtClose;
pub use com_stmt_execute::{ComStmtExecute, Cursor};
pub use com_stmt_fetch::ComStmtFetch;
pub use com_stmt_prepare::ComStmtPrepare;
pub use prepare_ok::PrepareOk;
