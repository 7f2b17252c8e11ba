use crate::error::{Error, Result};

pub struct Serializer {
	output: Vec<u8>,
}

pub fn to_vec(value: &(impl serde::Serialize + ?Sized)) -> Result<Vec<u8>> {
	let mut serializer = Serializer { output: Vec::new() };
	value.serialize(&mut serializer)?;

	Ok(serializer.output)
}

impl Serializer {
	fn put_u32(&mut self, value: u32) {
		self.output.extend(value.to_ne_bytes());
	}

	fn pad(&mut self, len: usize) {
		if len % 4 != 0 {
			self.output.extend((0..(4 - len % 4)).map(|_| 0u8));
		}
	}
}

macro_rules! unsupported {
	($($method:ident($ty:ty) => $what:literal;)*) => {
		$(
			fn $method(self, _: $ty) -> Result<()> {
				Err(Error::Unsupported($what))
			}
		)*
	};
}

impl<'a> serde::ser::Serializer for &'a mut Serializer {
	type Ok = ();
	type Error = Error;

	type SerializeSeq = Array<'a>;
	type SerializeTuple = Self;
	type SerializeTupleStruct = Self;
	type SerializeTupleVariant = serde::ser::Impossible<(), Error>;
	type SerializeMap = serde::ser::Impossible<(), Error>;
	type SerializeStruct = Self;
	type SerializeStructVariant = serde::ser::Impossible<(), Error>;

	unsupported! {
		serialize_bool(bool) => "bool";
		serialize_i8(i8) => "i8";
		serialize_i16(i16) => "i16";
		serialize_i64(i64) => "i64";
		serialize_u8(u8) => "u8";
		serialize_u16(u16) => "u16";
		serialize_u64(u64) => "u64";
		serialize_f32(f32) => "f32";
		serialize_char(char) => "char";
	}

	fn serialize_i32(self, v: i32) -> Result<()> {
		self.output.extend(v.to_ne_bytes());
		Ok(())
	}

	fn serialize_u32(self, v: u32) -> Result<()> {
		self.put_u32(v);
		Ok(())
	}

	// wl_fixed, 24.8 signed fixed point
	fn serialize_f64(self, v: f64) -> Result<()> {
		serde::Serializer::serialize_i32(self, (v * 256.0).round() as i32)
	}

	fn serialize_str(self, v: &str) -> Result<()> {
		let size = v.len() + 1;

		self.put_u32(size as u32);
		self.output.extend(v.as_bytes());
		self.output.push(0);
		self.pad(size);

		Ok(())
	}

	fn serialize_bytes(self, v: &[u8]) -> Result<()> {
		self.put_u32(v.len() as u32);
		self.output.extend(v);
		self.pad(v.len());

		Ok(())
	}

	// null string or null object
	fn serialize_none(self) -> Result<()> {
		self.put_u32(0);
		Ok(())
	}

	fn serialize_some<T: ?Sized>(self, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(self)
	}

	fn serialize_unit(self) -> Result<()> {
		Ok(())
	}

	fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
		Ok(())
	}

	fn serialize_unit_variant(
		self,
		_name: &'static str,
		variant_index: u32,
		_variant: &'static str,
	) -> Result<()> {
		self.put_u32(variant_index);
		Ok(())
	}

	fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(self)
	}

	fn serialize_newtype_variant<T: ?Sized>(
		self,
		_name: &'static str,
		_variant_index: u32,
		_variant: &'static str,
		_value: &T,
	) -> Result<()>
	where
		T: serde::Serialize,
	{
		Err(Error::Unsupported("enum with data"))
	}

	fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
		let start = self.output.len();
		self.put_u32(0);

		Ok(Array {
			serializer: self,
			start,
		})
	}

	fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
		Ok(self)
	}

	fn serialize_tuple_struct(
		self,
		_name: &'static str,
		_len: usize,
	) -> Result<Self::SerializeTupleStruct> {
		Ok(self)
	}

	fn serialize_tuple_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		_variant: &'static str,
		_len: usize,
	) -> Result<Self::SerializeTupleVariant> {
		Err(Error::Unsupported("enum with data"))
	}

	fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
		Err(Error::Unsupported("map"))
	}

	fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
		Ok(self)
	}

	fn serialize_struct_variant(
		self,
		_name: &'static str,
		_variant_index: u32,
		_variant: &'static str,
		_len: usize,
	) -> Result<Self::SerializeStructVariant> {
		Err(Error::Unsupported("enum with data"))
	}
}

/// `array` argument built from a sequence; the length prefix is patched in
/// once the elements are written.
pub struct Array<'a> {
	serializer: &'a mut Serializer,
	start: usize,
}

impl serde::ser::SerializeSeq for Array<'_> {
	type Ok = ();
	type Error = Error;

	fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(&mut *self.serializer)
	}

	fn end(self) -> Result<()> {
		let len = self.serializer.output.len() - self.start - 4;

		self.serializer.output[self.start..self.start + 4]
			.copy_from_slice(&(len as u32).to_ne_bytes());
		self.serializer.pad(len);

		Ok(())
	}
}

impl serde::ser::SerializeTuple for &mut Serializer {
	type Ok = ();
	type Error = Error;

	fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(&mut **self)
	}

	fn end(self) -> Result<()> {
		Ok(())
	}
}

impl serde::ser::SerializeTupleStruct for &mut Serializer {
	type Ok = ();
	type Error = Error;

	fn serialize_field<T: ?Sized>(&mut self, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(&mut **self)
	}

	fn end(self) -> Result<()> {
		Ok(())
	}
}

impl serde::ser::SerializeStruct for &mut Serializer {
	type Ok = ();
	type Error = Error;

	fn serialize_field<T: ?Sized>(&mut self, _key: &'static str, value: &T) -> Result<()>
	where
		T: serde::Serialize,
	{
		value.serialize(&mut **self)
	}

	fn end(self) -> Result<()> {
		Ok(())
	}
}
