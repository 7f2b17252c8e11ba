use crate::error::{Error, Result};

pub fn from_slice<'a, T: serde::Deserialize<'a>>(input: &'a [u8]) -> Result<T> {
	let mut deserializer = Deserializer { input };

	let ret = T::deserialize(&mut deserializer)?;

	if deserializer.input.is_empty() {
		Ok(ret)
	} else {
		Err(Error::TrailingData(deserializer.input.len()))
	}
}

pub struct Deserializer<'de> {
	input: &'de [u8],
}

impl<'de> Deserializer<'de> {
	fn take(&mut self, n: usize) -> Result<&'de [u8]> {
		if self.input.len() < n {
			return Err(Error::Truncated {
				needed: n - self.input.len(),
			});
		}

		let (ret, rest) = self.input.split_at(n);
		self.input = rest;
		Ok(ret)
	}

	fn peek_u32(&self) -> Result<u32> {
		let bytes = self.input.get(..4).ok_or_else(|| Error::Truncated {
			needed: 4 - self.input.len(),
		})?;

		Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
	}

	fn u32(&mut self) -> Result<u32> {
		let ret = self.peek_u32()?;
		self.input = &self.input[4..];
		Ok(ret)
	}

	fn i32(&mut self) -> Result<i32> {
		Ok(self.u32()? as i32)
	}

	/// Length-prefixed payload with the trailing padding skipped.
	fn padded(&mut self) -> Result<&'de [u8]> {
		let len = self.u32()? as usize;
		let ret = self.take(len)?;

		if len % 4 != 0 {
			self.take(4 - len % 4)?;
		}

		Ok(ret)
	}

	fn str(&mut self) -> Result<&'de str> {
		let bytes = self.padded()?;

		let Some((&0, text)) = bytes.split_last() else {
			return Err(Error::Message(String::from(
				"string argument is not nul terminated",
			)));
		};

		Ok(std::str::from_utf8(text)?)
	}
}

macro_rules! unsupported {
	($($method:ident => $what:literal;)*) => {
		$(
			fn $method<V>(self, _visitor: V) -> Result<V::Value>
			where
				V: serde::de::Visitor<'de>,
			{
				Err(Error::Unsupported($what))
			}
		)*
	};
}

impl<'de> serde::de::Deserializer<'de> for &mut Deserializer<'de> {
	type Error = Error;

	unsupported! {
		deserialize_any => "self-describing value";
		deserialize_bool => "bool";
		deserialize_i8 => "i8";
		deserialize_i16 => "i16";
		deserialize_i64 => "i64";
		deserialize_u8 => "u8";
		deserialize_u16 => "u16";
		deserialize_u64 => "u64";
		deserialize_f32 => "f32";
		deserialize_char => "char";
		deserialize_map => "map";
		deserialize_identifier => "identifier";
		deserialize_ignored_any => "ignored value";
	}

	fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_i32(self.i32()?)
	}

	fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_u32(self.u32()?)
	}

	fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_f64(self.i32()? as f64 / 256.0)
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_borrowed_str(self.str()?)
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		self.deserialize_str(visitor)
	}

	fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_borrowed_bytes(self.padded()?)
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		self.deserialize_bytes(visitor)
	}

	// a zero word is a null string or a null object id
	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		if self.peek_u32()? == 0 {
			self.u32()?;
			visitor.visit_none()
		} else {
			visitor.visit_some(self)
		}
	}

	fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_unit()
	}

	fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_unit()
	}

	fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		let mut array = Deserializer {
			input: self.padded()?,
		};

		let ret = visitor.visit_seq(Elements(&mut array))?;

		if !array.input.is_empty() {
			return Err(Error::TrailingData(array.input.len()));
		}

		Ok(ret)
	}

	fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_seq(self)
	}

	fn deserialize_tuple_struct<V>(
		self,
		_name: &'static str,
		_len: usize,
		visitor: V,
	) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_seq(self)
	}

	fn deserialize_struct<V>(
		self,
		_name: &'static str,
		_fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		visitor.visit_seq(self)
	}

	fn deserialize_enum<V>(
		self,
		_name: &'static str,
		_variants: &'static [&'static str],
		_visitor: V,
	) -> Result<V::Value>
	where
		V: serde::de::Visitor<'de>,
	{
		Err(Error::Unsupported("enum"))
	}
}

// Fixed-arity argument lists: the visitor knows how many it wants.
impl<'de> serde::de::SeqAccess<'de> for &mut Deserializer<'de> {
	type Error = Error;

	fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
	where
		T: serde::de::DeserializeSeed<'de>,
	{
		seed.deserialize(&mut **self).map(Some)
	}
}

/// Elements of an `array` argument, read until its payload runs out.
struct Elements<'a, 'de>(&'a mut Deserializer<'de>);

impl<'de> serde::de::SeqAccess<'de> for Elements<'_, 'de> {
	type Error = Error;

	fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
	where
		T: serde::de::DeserializeSeed<'de>,
	{
		if self.0.input.is_empty() {
			return Ok(None);
		}

		seed.deserialize(&mut *self.0).map(Some)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::encode::to_vec;

	#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
	struct Global<'a> {
		name: u32,
		interface: &'a str,
		version: u32,
	}

	#[test]
	fn struct_reads_arguments_in_order() {
		let bytes = to_vec(&(12u32, "xdg_wm_base", 2u32)).unwrap();
		let global: Global = from_slice(&bytes).unwrap();

		assert_eq!(
			global,
			Global {
				name: 12,
				interface: "xdg_wm_base",
				version: 2,
			}
		);
	}

	#[test]
	fn nullable_object_and_string() {
		let bytes = to_vec(&(None::<u32>, Some(5u32), None::<&str>)).unwrap();
		let ret: (Option<u32>, Option<u32>, Option<String>) = from_slice(&bytes).unwrap();

		assert_eq!(ret, (None, Some(5), None));
	}

	#[test]
	fn array_of_uints() {
		let bytes = to_vec(&(vec![4u32, 5], 9u32)).unwrap();
		let ret: (Vec<u32>, u32) = from_slice(&bytes).unwrap();

		assert_eq!(ret, (vec![4, 5], 9));
	}

	#[test]
	fn truncated_string_is_an_error() {
		let mut bytes = to_vec("wl_compositor").unwrap();
		bytes.truncate(10);

		assert!(matches!(
			from_slice::<String>(&bytes),
			Err(Error::Truncated { .. })
		));
	}

	#[test]
	fn short_uint_is_an_error() {
		assert!(matches!(
			from_slice::<u32>(&[1, 2]),
			Err(Error::Truncated { needed: 2 })
		));
	}

	#[test]
	fn leftover_bytes_are_rejected() {
		let bytes = to_vec(&(1u32, 2u32)).unwrap();

		assert!(matches!(
			from_slice::<u32>(&bytes),
			Err(Error::TrailingData(4))
		));
	}
}
