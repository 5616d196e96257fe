use byteorder::LittleEndian;

use crate::error::Error;
use crate::io::{Buf, BufExt};
use crate::protocol::{FieldFlags, TypeId};

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_com_query_response_text_resultset_column_definition.html
// https://mariadb.com/kb/en/resultset/#column-definition-packet
#[derive(Debug)]
pub struct ColumnDefinition {
    pub schema: Option<Box<str>>,

    pub table_alias: Option<Box<str>>,
    pub table: Option<Box<str>>,

    pub column_alias: Option<Box<str>>,
    pub column: Option<Box<str>>,

    pub char_set: u16,
    pub max_size: u32,
    pub type_id: TypeId,
    pub flags: FieldFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// The name a value decoder should address this column by.
    pub fn name(&self) -> Option<&str> {
        self.column_alias.as_deref().or(self.column.as_deref())
    }

    pub(crate) fn decode(mut buf: &[u8]) -> Result<Self, Error> {
        // catalog : string<lenenc>
        let catalog = buf.get_str_lenenc::<LittleEndian>()?;

        if catalog != Some("def") {
            return Err(err_protocol!(
                "expected column definition catalog \"def\"; received {:?}",
                catalog
            ));
        }

        let schema = buf.get_str_lenenc::<LittleEndian>()?.map(Into::into);
        let table_alias = buf.get_str_lenenc::<LittleEndian>()?.map(Into::into);
        let table = buf.get_str_lenenc::<LittleEndian>()?.map(Into::into);
        let column_alias = buf.get_str_lenenc::<LittleEndian>()?.map(Into::into);
        let column = buf.get_str_lenenc::<LittleEndian>()?.map(Into::into);

        let len_fixed_fields = buf.get_uint_lenenc::<LittleEndian>()?.unwrap_or(0);

        if len_fixed_fields != 0x0C {
            return Err(err_protocol!(
                "expected 0x0C fixed fields in a column definition; received {:?}",
                len_fixed_fields
            ));
        }

        let char_set = buf.get_u16::<LittleEndian>()?;
        let max_size = buf.get_u32::<LittleEndian>()?;

        let type_id = buf.get_u8()?;
        let flags = buf.get_u16::<LittleEndian>()?;
        let decimals = buf.get_u8()?;

        Ok(Self {
            schema,
            table_alias,
            table,
            column_alias,
            column,
            char_set,
            max_size,
            type_id: TypeId(type_id),
            flags: FieldFlags::from_bits_truncate(flags),
            decimals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnDefinition, TypeId};

    // `SELECT 1`: a single column named "1" of type LONG_LONG
    const COLUMN_DEF_SELECT_1: &[u8] =
        b"\x03def\x00\x00\x00\x011\x00\x0c\x3f\x00\x01\x00\x00\x00\x08\x81\x00\x00\x00\x00";

    #[test]
    fn it_decodes_a_column_definition() {
        let p = ColumnDefinition::decode(COLUMN_DEF_SELECT_1).unwrap();

        assert_eq!(p.schema.as_deref(), Some(""));
        assert_eq!(p.name(), Some("1"));
        assert_eq!(p.char_set, 63);
        assert_eq!(p.max_size, 1);
        assert_eq!(p.type_id, TypeId::BIG_INT);
        assert_eq!(p.decimals, 0);
    }
}
