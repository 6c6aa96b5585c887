use std::{fmt, iter::Peekable, str::Chars};

use enum_as_inner::EnumAsInner;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed descriptor '{descriptor}': {reason}")]
pub struct DescriptorError {
    pub descriptor: String,
    pub reason: String,
}

impl DescriptorError {
    pub fn new(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }
}

/// <BaseType> ::= 'B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z'
#[derive(EnumAsInner, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BaseType {
    Boolean, // Z
    Char,    // C
    Float,   // F
    Double,  // D
    Byte,    // B
    Short,   // S
    Int,     // I
    Long,    // J
    Void,    // V
}

impl BaseType {
    /// Maps a primitive code to the exact type it names.
    /// Booleans, chars, shorts and bytes stay distinct, which is what array element types need.
    pub fn from_code_no_wrap(code: char) -> Option<Self> {
        Some(match code {
            'Z' => BaseType::Boolean,
            'C' => BaseType::Char,
            'F' => BaseType::Float,
            'D' => BaseType::Double,
            'B' => BaseType::Byte,
            'S' => BaseType::Short,
            'I' => BaseType::Int,
            'J' => BaseType::Long,
            _ => return None,
        })
    }

    /// Maps a primitive code to the type its values take once loaded onto the operand stack.
    pub fn from_code(code: char) -> Option<Self> {
        Self::from_code_no_wrap(code).map(|ty| ty.widened())
    }

    pub fn widened(self) -> Self {
        match self {
            BaseType::Boolean | BaseType::Char | BaseType::Byte | BaseType::Short => BaseType::Int,
            other => other,
        }
    }

    pub fn code(self) -> char {
        match self {
            BaseType::Boolean => 'Z',
            BaseType::Char => 'C',
            BaseType::Float => 'F',
            BaseType::Double => 'D',
            BaseType::Byte => 'B',
            BaseType::Short => 'S',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Void => 'V',
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// <ObjectType> ::= 'L' <ClassName> ';'
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ObjectType {
    pub class_name: String,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{};", self.class_name)
    }
}

/// <ArrayType> ::= '[' <FieldType>
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ArrayType {
    pub field_type: Box<FieldType>,
}

impl ArrayType {
    pub fn dimensions(&self) -> usize {
        match self.field_type.as_ref() {
            FieldType::Array(inner) => 1 + inner.dimensions(),
            _ => 1,
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.field_type)
    }
}

#[derive(EnumAsInner, Debug, PartialEq, Eq, Hash, Clone)]
pub enum FieldType {
    Base(BaseType),
    Object(ObjectType),
    Array(ArrayType),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => base.fmt(f),
            FieldType::Object(object) => object.fmt(f),
            FieldType::Array(array) => array.fmt(f),
        }
    }
}

/// <MethodType> ::= '(' { <FieldType> } ')' <FieldType>
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MethodType {
    pub parameters: Vec<FieldType>,
    pub return_type: FieldType,
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for param in &self.parameters {
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.return_type)
    }
}

impl MethodType {
    pub fn parse(str: impl AsRef<str>) -> Result<Self, DescriptorError> {
        let str = str.as_ref();
        let fault = |reason: &str| DescriptorError::new(str, reason);

        let mut chars = str.chars().peekable();
        if chars.next() != Some('(') {
            return Err(fault("method descriptor did not start with ("));
        }

        let mut parameters = Vec::new();
        loop {
            match chars.peek() {
                Some(')') => break,
                None => return Err(fault("unterminated parameter list")),
                Some(_) => {
                    let param = FieldType::parse_from_iterator(str, &mut chars)?;
                    if param == FieldType::Base(BaseType::Void) {
                        return Err(fault("void is not a valid parameter type"));
                    }
                    parameters.push(param);
                }
            }
        }

        // Skip )
        chars.next();

        let return_type = FieldType::parse_from_iterator(str, &mut chars)?;
        if chars.next().is_some() {
            return Err(fault("trailing characters after return type"));
        }

        Ok(MethodType {
            parameters,
            return_type,
        })
    }
}

impl FieldType {
    fn parse_from_iterator(source: &str, chars: &mut Peekable<Chars>) -> Result<Self, DescriptorError> {
        let first = chars
            .next()
            .ok_or_else(|| DescriptorError::new(source, "unexpected end of descriptor"))?;

        if let Some(base) = BaseType::from_code_no_wrap(first) {
            return Ok(FieldType::Base(base));
        }

        Ok(match first {
            'V' => FieldType::Base(BaseType::Void),
            '[' => {
                let element = FieldType::parse_from_iterator(source, chars)?;
                if element == FieldType::Base(BaseType::Void) {
                    return Err(DescriptorError::new(source, "array of void"));
                }

                FieldType::Array(ArrayType {
                    field_type: Box::new(element),
                })
            }
            'L' => {
                let mut class_name = String::new();
                loop {
                    match chars.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => {
                            return Err(DescriptorError::new(source, "unterminated class name"))
                        }
                    }
                }

                if class_name.is_empty() {
                    return Err(DescriptorError::new(source, "empty class name"));
                }

                FieldType::Object(ObjectType { class_name })
            }
            _ => return Err(DescriptorError::new(source, format!("unknown type {first}"))),
        })
    }

    pub fn parse(str: impl AsRef<str>) -> Result<Self, DescriptorError> {
        let str = str.as_ref();
        let mut chars = str.chars().peekable();
        let ty = FieldType::parse_from_iterator(str, &mut chars)?;

        if chars.next().is_some() {
            return Err(DescriptorError::new(str, "trailing characters"));
        }

        Ok(ty)
    }
}
