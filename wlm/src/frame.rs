use crate::{
	error::Result,
	message::{Header, RawMessage, HEADER_SIZE},
};

/// Moves every complete message at the front of `buffer` into `queue` and
/// returns how many were moved. Bytes of a trailing partial message stay in
/// `buffer` for the next read.
pub fn drain_frames(
	buffer: &mut Vec<u8>,
	queue: &mut std::collections::VecDeque<RawMessage>,
) -> Result<usize> {
	let mut offset = 0;
	let mut count = 0;

	let ret = loop {
		let Some(header) = Header::parse(&buffer[offset..]) else {
			break Ok(count);
		};

		if let Err(x) = header.validate() {
			break Err(x);
		}

		let size = header.size as usize;
		let Some(frame) = buffer.get(offset..offset + size) else {
			break Ok(count);
		};

		queue.push_back(RawMessage {
			object_id: header.object_id,
			op: header.op,
			args: frame[HEADER_SIZE..].to_vec(),
		});

		offset += size;
		count += 1;
	};

	buffer.drain(..offset);
	ret
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Error, Message};

	fn sync(object_id: u32, callback: u32) -> Vec<u8> {
		Message {
			object_id,
			op: 0,
			args: callback,
		}
		.to_vec()
		.unwrap()
	}

	#[test]
	fn frames_arrive_in_wire_order() {
		let mut buffer = [sync(1, 2), sync(1, 3), sync(1, 4)].concat();
		let mut queue = Default::default();

		assert_eq!(drain_frames(&mut buffer, &mut queue).unwrap(), 3);
		assert!(buffer.is_empty());

		let callbacks = queue
			.iter()
			.map(|x| x.decode::<u32>().unwrap())
			.collect::<Vec<_>>();

		assert_eq!(callbacks, [2, 3, 4]);
	}

	#[test]
	fn partial_frame_waits_for_more_bytes() {
		let bytes = [sync(1, 2), sync(5, 6)].concat();
		let (first, rest) = bytes.split_at(bytes.len() - 3);

		let mut buffer = first.to_vec();
		let mut queue = Default::default();

		assert_eq!(drain_frames(&mut buffer, &mut queue).unwrap(), 1);
		assert_eq!(buffer.len(), 12 - 3);

		buffer.extend_from_slice(rest);

		assert_eq!(drain_frames(&mut buffer, &mut queue).unwrap(), 1);
		assert_eq!(queue.back().unwrap().object_id, 5);
		assert!(buffer.is_empty());
	}

	#[test]
	fn header_alone_is_not_a_frame() {
		let bytes = sync(1, 2);
		let mut buffer = bytes[..8].to_vec();
		let mut queue = Default::default();

		assert_eq!(drain_frames(&mut buffer, &mut queue).unwrap(), 0);
		assert!(queue.is_empty());
		assert_eq!(buffer.len(), 8);
	}

	#[test]
	fn invalid_size_keeps_earlier_frames() {
		let mut bad = sync(9, 0);
		bad[4..8].copy_from_slice(&(6u32 << 16).to_ne_bytes());

		let mut buffer = [sync(1, 2), bad].concat();
		let mut queue = Default::default();

		let ret = drain_frames(&mut buffer, &mut queue);

		assert!(matches!(ret, Err(Error::InvalidSize { object_id: 9, size: 6 })));
		assert_eq!(queue.len(), 1);
		assert_eq!(buffer.len(), 12);
	}
}
