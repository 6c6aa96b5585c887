use anyhow::{anyhow, Result};
use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantTag {
    Class,
    Field,
    Method,
    InterfaceMethod,
    String,
    Integer,
    Float,
    Long,
    Double,
    NameAndType,
    Utf8,
    MethodHandle,
    MethodType,
    Dynamic,
    InvokeDynamic,
    Module,
    Package,
}

impl ConstantTag {
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            1 => ConstantTag::Utf8,
            3 => ConstantTag::Integer,
            4 => ConstantTag::Float,
            5 => ConstantTag::Long,
            6 => ConstantTag::Double,
            7 => ConstantTag::Class,
            8 => ConstantTag::String,
            9 => ConstantTag::Field,
            10 => ConstantTag::Method,
            11 => ConstantTag::InterfaceMethod,
            12 => ConstantTag::NameAndType,
            15 => ConstantTag::MethodHandle,
            16 => ConstantTag::MethodType,
            17 => ConstantTag::Dynamic,
            18 => ConstantTag::InvokeDynamic,
            19 => ConstantTag::Module,
            20 => ConstantTag::Package,
            _ => return Err(anyhow!("{} is an unknown constant tag", tag)),
        })
    }
}

/// A member reference (field, method or interface method).
#[derive(Debug, Clone)]
pub struct ConstantMember {
    pub class: u16,
    pub name_and_type: u16,
}

#[derive(Debug, Clone)]
pub struct ConstantNameAndType {
    pub name: u16,
    pub descriptor: u16,
}

#[derive(Debug, Clone)]
pub struct ConstantDynamic {
    pub method_index: u16,
    pub name_and_type: u16,
}

#[derive(EnumAsInner, Clone, Debug)]
pub enum ConstantEntry {
    Class { name: u16 },
    Field(ConstantMember),
    Method(ConstantMember),
    InterfaceMethod(ConstantMember),
    String { string: u16 },
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    NameAndType(ConstantNameAndType),
    Utf8(String),
    MethodHandle { kind: u8, index: u16 },
    MethodType { descriptor: u16 },
    Dynamic(ConstantDynamic),
    InvokeDynamic(ConstantDynamic),
    Module { name: u16 },
    Package { name: u16 },
    /// The unusable slot following a long or double.
    Reserved,
}

/// The constant pool, addressed from 1 as in the class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantEntry>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ConstantEntry) {
        self.entries.push(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&ConstantEntry> {
        if index == 0 {
            return Err(anyhow!("constant pool index 0 is never valid"));
        }

        self.entries
            .get((index - 1) as usize)
            .ok_or_else(|| anyhow!("constant pool index {} out of range ({})", index, self.len()))
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            ConstantEntry::Utf8(value) => Ok(value),
            other => Err(anyhow!("expected Utf8 @ {}, got {:?}", index, other)),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            ConstantEntry::Class { name } => self.utf8(*name),
            other => Err(anyhow!("expected Class @ {}, got {:?}", index, other)),
        }
    }

    fn name_and_type(&self, index: u16) -> Result<&ConstantNameAndType> {
        match self.get(index)? {
            ConstantEntry::NameAndType(nat) => Ok(nat),
            other => Err(anyhow!("expected NameAndType @ {}, got {:?}", index, other)),
        }
    }

    // Format checking: every index stored in the pool has to point at an entry of the right kind (§4.4).
    pub(crate) fn perform_format_checking(&self) -> Result<()> {
        for entry in self.entries.iter() {
            match entry {
                ConstantEntry::Class { name }
                | ConstantEntry::Module { name }
                | ConstantEntry::Package { name } => {
                    self.utf8(*name)?;
                }
                ConstantEntry::String { string } => {
                    self.utf8(*string)?;
                }
                ConstantEntry::MethodType { descriptor } => {
                    self.utf8(*descriptor)?;
                }
                ConstantEntry::Field(member)
                | ConstantEntry::Method(member)
                | ConstantEntry::InterfaceMethod(member) => {
                    self.class_name(member.class)?;
                    self.name_and_type(member.name_and_type)?;
                }
                ConstantEntry::NameAndType(nat) => {
                    self.utf8(nat.name)?;
                    self.utf8(nat.descriptor)?;
                }
                ConstantEntry::Dynamic(dynamic) | ConstantEntry::InvokeDynamic(dynamic) => {
                    self.name_and_type(dynamic.name_and_type)?;
                }
                ConstantEntry::MethodHandle { index, .. } => {
                    self.get(*index)?;
                }
                ConstantEntry::Integer(_)
                | ConstantEntry::Float(_)
                | ConstantEntry::Long(_)
                | ConstantEntry::Double(_)
                | ConstantEntry::Utf8(_)
                | ConstantEntry::Reserved => {}
            }
        }

        Ok(())
    }
}

/// Decodes the "modified UTF-8" used by class files: NUL is two bytes and
/// supplementary characters are stored as two encoded surrogates.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    let continuation = |i: usize| -> Result<u16> {
        match bytes.get(i) {
            Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
            _ => Err(anyhow!("bad continuation byte at {}", i)),
        }
    };

    while i < bytes.len() {
        let x = bytes[i];
        if x & 0x80 == 0 {
            units.push(x as u16);
            i += 1;
        } else if x & 0xE0 == 0xC0 {
            units.push((((x & 0x1F) as u16) << 6) | continuation(i + 1)?);
            i += 2;
        } else if x & 0xF0 == 0xE0 {
            units.push(
                (((x & 0x0F) as u16) << 12) | (continuation(i + 1)? << 6) | continuation(i + 2)?,
            );
            i += 3;
        } else {
            return Err(anyhow!("invalid modified utf8 lead byte {:#x} at {}", x, i));
        }
    }

    Ok(String::from_utf16(&units)?)
}
