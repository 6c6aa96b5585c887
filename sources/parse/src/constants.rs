pub const MAGIC: u32 = 0xCAFEBABE;
