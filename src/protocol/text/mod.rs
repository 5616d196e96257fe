mod com_change_user;
mod com_init_db;
mod com_ping;
mod com_query;
mod com_quit;
mod com_reset_connection;
mod local_infile;

pub use com_change_user::ComChangeUser;
pub use com_init_db::ComInitDb;
pub use com_ping::ComPing;
pub use com_query::ComQuery;
pub use com_quit::ComQuit;
pub use com_reset_connection::ComResetConnection;
pub use local_infile::LocalInfileData;
