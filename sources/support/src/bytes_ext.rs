use anyhow::{anyhow, Result};
use bytes::{Buf, Bytes};

/// Bounds-checked reads. `Buf` panics when it runs dry; class files come from
/// untrusted sources so truncation has to surface as an error instead.
pub trait SafeBuf {
    fn try_get_u8(&mut self) -> Result<u8>;
    fn try_get_u16(&mut self) -> Result<u16>;
    fn try_get_u32(&mut self) -> Result<u32>;
    fn try_get_u64(&mut self) -> Result<u64>;
    fn try_get_f32(&mut self) -> Result<f32>;
    fn try_get_f64(&mut self) -> Result<f64>;
    fn try_get_bytes(&mut self, len: usize) -> Result<Bytes>;
}

macro_rules! checked {
    ($name: ident, $ty: ty, $getter: ident) => {
        fn $name(&mut self) -> Result<$ty> {
            let wanted = std::mem::size_of::<$ty>();
            if self.remaining() < wanted {
                return Err(anyhow!(
                    "unexpected end of input: wanted {} bytes, {} left",
                    wanted,
                    self.remaining()
                ));
            }

            Ok(self.$getter())
        }
    };
}

impl SafeBuf for Bytes {
    checked!(try_get_u8, u8, get_u8);
    checked!(try_get_u16, u16, get_u16);
    checked!(try_get_u32, u32, get_u32);
    checked!(try_get_u64, u64, get_u64);
    checked!(try_get_f32, f32, get_f32);
    checked!(try_get_f64, f64, get_f64);

    fn try_get_bytes(&mut self, len: usize) -> Result<Bytes> {
        if self.remaining() < len {
            return Err(anyhow!(
                "unexpected end of input: wanted {} bytes, {} left",
                len,
                self.remaining()
            ));
        }

        Ok(self.split_to(len))
    }
}
