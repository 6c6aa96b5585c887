use anyhow::Result;
use bytes::Bytes;
use support::bytes_ext::SafeBuf;

use crate::pool::ConstantPool;

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub data: Bytes,
}

/// Attributes are kept raw; decoding them belongs to whoever executes the class.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub values: Vec<Attribute>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.values.iter().find(|attr| attr.name == name)
    }

    pub fn parse(bytes: &mut Bytes, constant_pool: &ConstantPool) -> Result<Self> {
        let length = bytes.try_get_u16()?;
        let mut attributes = Attributes {
            values: Vec::with_capacity(length.into()),
        };

        for _ in 0..length {
            let name = constant_pool.utf8(bytes.try_get_u16()?)?.to_string();
            let attr_length = bytes.try_get_u32()?;
            let data = bytes.try_get_bytes(attr_length as usize)?;

            attributes.values.push(Attribute { name, data });
        }

        Ok(attributes)
    }
}
