use anyhow::{anyhow, Result};
use bytes::Bytes;
use support::bytes_ext::SafeBuf;

use crate::attributes::Attributes;
use crate::classfile::{ClassFile, Field, MetaData, Method};
use crate::constants::MAGIC;
use crate::flags::{ClassFileAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::pool::{
    decode_modified_utf8, ConstantDynamic, ConstantEntry, ConstantMember, ConstantNameAndType,
    ConstantPool, ConstantTag,
};
use crate::result::ParseResult;

pub struct Parser {
    bytes: Bytes,
}

impl Parser {
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(data),
        }
    }

    fn member(&mut self) -> Result<ConstantMember> {
        Ok(ConstantMember {
            class: self.bytes.try_get_u16()?,
            name_and_type: self.bytes.try_get_u16()?,
        })
    }

    fn dynamic(&mut self) -> Result<ConstantDynamic> {
        Ok(ConstantDynamic {
            method_index: self.bytes.try_get_u16()?,
            name_and_type: self.bytes.try_get_u16()?,
        })
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let length = self.bytes.try_get_u16()?;
        if length == 0 {
            return Err(anyhow!("constant pool count must be at least 1"));
        }

        let mut pool = ConstantPool::new();

        let mut i = 0;
        while i < (length - 1) {
            let tag = ConstantTag::from_tag(self.bytes.try_get_u8()?)?;
            let entry = match tag {
                ConstantTag::Class => ConstantEntry::Class {
                    name: self.bytes.try_get_u16()?,
                },
                ConstantTag::Field => ConstantEntry::Field(self.member()?),
                ConstantTag::Method => ConstantEntry::Method(self.member()?),
                ConstantTag::InterfaceMethod => ConstantEntry::InterfaceMethod(self.member()?),
                ConstantTag::String => ConstantEntry::String {
                    string: self.bytes.try_get_u16()?,
                },
                ConstantTag::Integer => ConstantEntry::Integer(self.bytes.try_get_u32()? as i32),
                ConstantTag::Float => ConstantEntry::Float(self.bytes.try_get_f32()?),
                ConstantTag::Long => ConstantEntry::Long(self.bytes.try_get_u64()? as i64),
                ConstantTag::Double => ConstantEntry::Double(self.bytes.try_get_f64()?),
                ConstantTag::NameAndType => ConstantEntry::NameAndType(ConstantNameAndType {
                    name: self.bytes.try_get_u16()?,
                    descriptor: self.bytes.try_get_u16()?,
                }),
                ConstantTag::Utf8 => {
                    let length = self.bytes.try_get_u16()?;
                    let bytes = self.bytes.try_get_bytes(length.into())?;
                    ConstantEntry::Utf8(decode_modified_utf8(&bytes)?)
                }
                ConstantTag::MethodHandle => ConstantEntry::MethodHandle {
                    kind: self.bytes.try_get_u8()?,
                    index: self.bytes.try_get_u16()?,
                },
                ConstantTag::MethodType => ConstantEntry::MethodType {
                    descriptor: self.bytes.try_get_u16()?,
                },
                ConstantTag::Dynamic => ConstantEntry::Dynamic(self.dynamic()?),
                ConstantTag::InvokeDynamic => ConstantEntry::InvokeDynamic(self.dynamic()?),
                ConstantTag::Module => ConstantEntry::Module {
                    name: self.bytes.try_get_u16()?,
                },
                ConstantTag::Package => ConstantEntry::Package {
                    name: self.bytes.try_get_u16()?,
                },
            };

            let should_reserve_next =
                matches!(entry, ConstantEntry::Long(_) | ConstantEntry::Double(_));
            pool.insert(entry);

            // Special case: 64 Bit types are supposed to take up 2 slots
            // So, insert a dummy and increment the index by an additional 1
            if should_reserve_next {
                pool.insert(ConstantEntry::Reserved);
                i += 1;
            }

            i += 1;
        }

        Ok(pool)
    }

    fn parse_interfaces(&mut self, pool: &ConstantPool) -> Result<Vec<String>> {
        let length = self.bytes.try_get_u16()?;
        let mut interfaces = Vec::with_capacity(length.into());

        for _ in 0..length {
            interfaces.push(pool.class_name(self.bytes.try_get_u16()?)?.to_string());
        }

        Ok(interfaces)
    }

    fn parse_fields(&mut self, pool: &ConstantPool) -> Result<Vec<Field>> {
        let length = self.bytes.try_get_u16()?;
        let mut fields = Vec::with_capacity(length.into());

        for _ in 0..length {
            fields.push(Field {
                flags: FieldAccessFlags::from_bits_truncate(self.bytes.try_get_u16()?),
                name: pool.utf8(self.bytes.try_get_u16()?)?.to_string(),
                descriptor: pool.utf8(self.bytes.try_get_u16()?)?.to_string(),
                attributes: Attributes::parse(&mut self.bytes, pool)?,
            });
        }

        Ok(fields)
    }

    fn parse_methods(&mut self, pool: &ConstantPool) -> Result<Vec<Method>> {
        let length = self.bytes.try_get_u16()?;
        let mut methods = Vec::with_capacity(length.into());

        for _ in 0..length {
            methods.push(Method {
                flags: MethodAccessFlags::from_bits_truncate(self.bytes.try_get_u16()?),
                name: pool.utf8(self.bytes.try_get_u16()?)?.to_string(),
                descriptor: pool.utf8(self.bytes.try_get_u16()?)?.to_string(),
                attributes: Attributes::parse(&mut self.bytes, pool)?,
            });
        }

        Ok(methods)
    }

    pub fn parse(&mut self) -> ParseResult {
        let magic = self.bytes.try_get_u32()?;

        // Format checking: The first four bytes must contain the right magic number
        if magic != MAGIC {
            return Err(anyhow!("invalid magic value '{:#x}'", magic));
        }

        let minor = self.bytes.try_get_u16()?;
        let major = self.bytes.try_get_u16()?;

        let meta_data = MetaData {
            minor_version: minor,
            major_version: major,
        };

        let constant_pool = self.parse_constant_pool()?;
        // Format checking: The constant pool must satisfy the constraints documented throughout §4.4.
        constant_pool.perform_format_checking()?;

        let access_flags = ClassFileAccessFlags::from_bits_truncate(self.bytes.try_get_u16()?);
        let this_class = constant_pool
            .class_name(self.bytes.try_get_u16()?)?
            .to_string();

        let super_class_index = self.bytes.try_get_u16()?;
        let super_class = if super_class_index != 0 {
            Some(constant_pool.class_name(super_class_index)?.to_string())
        } else {
            None
        };

        let interfaces = self.parse_interfaces(&constant_pool)?;
        let fields = self.parse_fields(&constant_pool)?;
        let methods = self.parse_methods(&constant_pool)?;
        let attributes = Attributes::parse(&mut self.bytes, &constant_pool)?;

        // Format checking: The class file must not be truncated or have extra bytes at the end
        if !self.bytes.is_empty() {
            return Err(anyhow!("classfile has extra bytes at the end"));
        }

        Ok(ClassFile {
            constant_pool,
            meta_data,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(out: &mut Vec<u8>, s: &str) {
        out.push(1);
        out.extend((s.len() as u16).to_be_bytes());
        out.extend(s.as_bytes());
    }

    fn class(out: &mut Vec<u8>, name_index: u16) {
        out.push(7);
        out.extend(name_index.to_be_bytes());
    }

    /// public class Sample extends java/lang/Object { static main([Ljava/lang/String;)V; long x; }
    fn sample() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(MAGIC.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(52u16.to_be_bytes());

        // 1 Sample, 2 Class(1), 3 java/lang/Object, 4 Class(3), 5 main, 6 desc, 7 x, 8 J, 9 Long(2 slots), 11 SourceFile
        out.extend(12u16.to_be_bytes());
        utf8(&mut out, "Sample");
        class(&mut out, 1);
        utf8(&mut out, "java/lang/Object");
        class(&mut out, 3);
        utf8(&mut out, "main");
        utf8(&mut out, "([Ljava/lang/String;)V");
        utf8(&mut out, "x");
        utf8(&mut out, "J");
        out.push(5);
        out.extend(42u64.to_be_bytes());
        utf8(&mut out, "SourceFile");

        out.extend(0x0021u16.to_be_bytes());
        out.extend(2u16.to_be_bytes());
        out.extend(4u16.to_be_bytes());
        // interfaces
        out.extend(0u16.to_be_bytes());

        // fields
        out.extend(1u16.to_be_bytes());
        out.extend(0x0002u16.to_be_bytes());
        out.extend(7u16.to_be_bytes());
        out.extend(8u16.to_be_bytes());
        out.extend(0u16.to_be_bytes());

        // methods
        out.extend(1u16.to_be_bytes());
        out.extend(0x0009u16.to_be_bytes());
        out.extend(5u16.to_be_bytes());
        out.extend(6u16.to_be_bytes());
        out.extend(0u16.to_be_bytes());

        // attributes: SourceFile -> index 1
        out.extend(1u16.to_be_bytes());
        out.extend(11u16.to_be_bytes());
        out.extend(2u32.to_be_bytes());
        out.extend(1u16.to_be_bytes());

        out
    }

    #[test]
    fn it_parses_a_class_file() {
        let class = Parser::new(&sample()).parse().unwrap();

        assert_eq!(class.this_class, "Sample");
        assert_eq!(class.super_class.as_deref(), Some("java/lang/Object"));
        assert_eq!(class.meta_data.major_version, 52);
        assert!(class.access_flags.contains(ClassFileAccessFlags::PUBLIC));

        let main = class.locate_method("main", "([Ljava/lang/String;)V").unwrap();
        assert!(main.flags.contains(MethodAccessFlags::STATIC));

        assert!(class.locate_field("x", "J").is_some());
        assert!(matches!(
            class.constant_pool.get(10).unwrap(),
            ConstantEntry::Reserved
        ));
        assert_eq!(class.attributes.get("SourceFile").unwrap().data.len(), 2);
    }

    #[test]
    fn it_rejects_bad_magic() {
        let mut bytes = sample();
        bytes[0] = 0;
        assert!(Parser::new(&bytes).parse().is_err());
    }

    #[test]
    fn it_rejects_truncated_and_padded_input() {
        let bytes = sample();
        assert!(Parser::new(&bytes[..bytes.len() - 1]).parse().is_err());

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(Parser::new(&padded).parse().is_err());
    }
}
