// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/mysql__com_8h.html#a1d854e841086925be1883e4d7b4e8cad
// https://mariadb.com/kb/en/ok_packet/#server-status-flag
bitflags::bitflags! {
    /// Server status flags carried in OK and EOF packets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u16 {
        // A transaction is currently active
        const SERVER_STATUS_IN_TRANS = 1;

        // Autocommit mode is set
        const SERVER_STATUS_AUTOCOMMIT = 2;

        // More results exist (more packets will follow)
        const SERVER_MORE_RESULTS_EXISTS = 8;

        const SERVER_QUERY_NO_GOOD_INDEX_USED = 16;
        const SERVER_QUERY_NO_INDEX_USED = 32;

        // When using COM_STMT_FETCH, indicate that current cursor still has result
        const SERVER_STATUS_CURSOR_EXISTS = 64;

        // When using COM_STMT_FETCH, indicate that current cursor has finished to send results
        const SERVER_STATUS_LAST_ROW_SENT = 128;

        // Database has been dropped
        const SERVER_STATUS_DB_DROPPED = 256;

        // Current escape mode is "no backslash escape"
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 512;

        // A DDL change did have an impact on an existing PREPARE (an automatic
        // re-prepare has been executed)
        const SERVER_STATUS_METADATA_CHANGED = 1024;

        const SERVER_QUERY_WAS_SLOW = 2048;

        // This result-set contain stored procedure output parameters
        const SERVER_PS_OUT_PARAMS = 4096;

        // Current transaction is a read-only transaction
        const SERVER_STATUS_IN_TRANS_READONLY = 8192;

        // Session state change. See Session change type for more information
        const SERVER_SESSION_STATE_CHANGED = 16384;
    }
}
