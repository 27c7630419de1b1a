//! Length-prefixed bincode framing shared by file-backed logs.
//!
//! Every item is stored as:
//! ```text
//! [u32 length, little endian][bincode serialized T]
//! ```

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::repository::{RepositoryError, Result};

/// Write one frame. Returns the number of bytes written.
pub(crate) fn write_frame<T, W>(writer: &mut W, item: &T) -> Result<u64>
where
    T: Serialize,
    W: Write,
{
    let bytes =
        bincode::serialize(item).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| RepositoryError::Serialization(format!("frame of {} bytes", bytes.len())))?;

    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&bytes)?;

    Ok(4 + bytes.len() as u64)
}

/// Read one frame, or `None` at a clean end of file.
///
/// A truncated length prefix is treated as the end of the log; a truncated
/// body is corruption.
pub(crate) fn read_frame<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RepositoryError::Io(e)),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            RepositoryError::CorruptedData(format!("frame body shorter than {len} bytes"))
        } else {
            RepositoryError::Io(e)
        }
    })?;

    bincode::deserialize(&data)
        .map(Some)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Read every frame of the file at `path`. A missing file reads as empty.
pub(crate) fn read_all<T>(path: &Path) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RepositoryError::Io(e)),
    };

    let mut reader = BufReader::new(file);
    let mut items = Vec::new();
    while let Some(item) = read_frame(&mut reader)? {
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn truncated_body_is_corruption() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &"hello".to_string()).unwrap();
        buffer.truncate(buffer.len() - 2);

        let result: Result<Option<String>> = read_frame(&mut Cursor::new(buffer));
        assert!(matches!(result, Err(RepositoryError::CorruptedData(_))));
    }

    #[test]
    fn clean_end_reads_as_none() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &7u32).unwrap();

        let mut cursor = Cursor::new(buffer);
        assert_eq!(read_frame::<u32, _>(&mut cursor).unwrap(), Some(7));
        assert_eq!(read_frame::<u32, _>(&mut cursor).unwrap(), None);
    }
}
