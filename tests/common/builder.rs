use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_NATIVE: u16 = 0x0100;

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl Pool {
    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }

        self.bytes.push(1);
        self.bytes.extend((value.len() as u16).to_be_bytes());
        self.bytes.extend(value.as_bytes());
        self.count += 1;
        self.utf8.insert(value.to_string(), self.count);
        self.count
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }

        let name_index = self.utf8(name);
        self.bytes.push(7);
        self.bytes.extend(name_index.to_be_bytes());
        self.count += 1;
        self.classes.insert(name.to_string(), self.count);
        self.count
    }
}

/// Writes minimal class files: names, flags and member signatures, no code.
#[derive(Clone)]
pub struct ClassBuilder {
    name: String,
    super_class: Option<String>,
    access: u16,
    fields: Vec<(u16, String, String)>,
    methods: Vec<(u16, String, String)>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_class: Some("java/lang/Object".to_string()),
            access: ACC_PUBLIC | ACC_SUPER,
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn extends(mut self, super_class: Option<&str>) -> Self {
        self.super_class = super_class.map(str::to_string);
        self
    }

    pub fn method(mut self, flags: u16, name: &str, descriptor: &str) -> Self {
        self.methods
            .push((flags, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn static_method(self, name: &str, descriptor: &str) -> Self {
        self.method(ACC_PUBLIC | ACC_STATIC, name, descriptor)
    }

    pub fn constructor(self, descriptor: &str) -> Self {
        self.method(ACC_PUBLIC, "<init>", descriptor)
    }

    pub fn clinit(self) -> Self {
        self.method(ACC_STATIC, "<clinit>", "()V")
    }

    pub fn field(mut self, flags: u16, name: &str, descriptor: &str) -> Self {
        self.fields
            .push((flags, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this_class = pool.class(&self.name);
        let super_class = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);

        let mut members = |entries: &[(u16, String, String)]| {
            let mut out = Vec::new();
            out.extend((entries.len() as u16).to_be_bytes());
            for (flags, name, descriptor) in entries {
                out.extend(flags.to_be_bytes());
                out.extend(pool.utf8(name).to_be_bytes());
                out.extend(pool.utf8(descriptor).to_be_bytes());
                out.extend(0u16.to_be_bytes());
            }
            out
        };

        let fields = members(&self.fields);
        let methods = members(&self.methods);

        let mut out = Vec::new();
        out.extend(0xCAFEBABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(52u16.to_be_bytes());
        out.extend((pool.count + 1).to_be_bytes());
        out.extend(&pool.bytes);
        out.extend(self.access.to_be_bytes());
        out.extend(this_class.to_be_bytes());
        out.extend(super_class.to_be_bytes());
        out.extend(0u16.to_be_bytes());
        out.extend(fields);
        out.extend(methods);
        out.extend(0u16.to_be_bytes());
        out
    }
}
