use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use sha2::{Digest, Sha256};

use crate::api::client::Client;

/// Files are split into blocks of this size before upload
pub const BLOCK_SIZE: usize = 64 * 1024 * 1024;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Client {
    /// Store one block and return its locator (`<digest>+<len>`)
    pub fn put_block(&self, bytes: &[u8]) -> Result<String> {
        let digest = hex(&Sha256::digest(bytes));
        let locator = self
            .put_bytes(&format!("/storage/blocks/{digest}"), bytes)
            .with_context(|| format!("storing block {digest}"))?;
        let locator = locator.trim().to_string();
        if locator.is_empty() {
            bail!("storage service returned an empty locator for block {digest}");
        }
        Ok(locator)
    }
}

/// Assembles a single-stream manifest from uploaded blocks.
///
/// File entries address a contiguous byte range of the concatenated block
/// data, so offsets accumulate across files in upload order.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    locators: Vec<String>,
    files: Vec<FileEntry>,
    offset: u64,
}

#[derive(Debug)]
struct FileEntry {
    offset: u64,
    len: u64,
    name: String,
}

impl ManifestBuilder {
    pub fn new() -> ManifestBuilder {
        ManifestBuilder::default()
    }

    pub fn add_file(&mut self, name: &str, locators: Vec<String>, len: u64) {
        self.locators.extend(locators);
        self.files.push(FileEntry {
            offset: self.offset,
            len,
            name: name.to_string(),
        });
        self.offset += len;
    }

    pub fn manifest_text(&self) -> String {
        let mut fields: Vec<String> = vec![".".to_string()];
        fields.extend(self.locators.iter().cloned());
        for file in &self.files {
            fields.push(format!("{}:{}:{}", file.offset, file.len, file.name));
        }
        let mut text = fields.join(" ");
        text.push('\n');
        text
    }
}

/// Upload a local file block by block and record it in the manifest under
/// `remote_name`.
pub fn upload_file(
    client: &Client,
    manifest: &mut ManifestBuilder,
    local: &Path,
    remote_name: &str,
) -> Result<()> {
    info!("Uploading {} as {remote_name}", local.display());
    let mut file =
        File::open(local).with_context(|| format!("opening {}", local.display()))?;
    let mut locators = Vec::new();
    let mut total: u64 = 0;
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = read_block(&mut file, &mut buf)
            .with_context(|| format!("reading {}", local.display()))?;
        if n == 0 {
            break;
        }
        locators.push(client.put_block(&buf[..n])?);
        total += n as u64;
    }
    if locators.is_empty() {
        bail!("{} is empty", local.display());
    }
    manifest.add_file(remote_name, locators, total);
    Ok(())
}

/// Fill `buf` as far as the reader allows; short reads only at end of file
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_offsets_accumulate_across_files() {
        let mut manifest = ManifestBuilder::new();
        manifest.add_file("sequence.fasta", vec!["aaa+100".to_string()], 100);
        manifest.add_file(
            "metadata.yaml",
            vec!["bbb+64".to_string(), "ccc+16".to_string()],
            80,
        );
        assert_eq!(
            manifest.manifest_text(),
            ". aaa+100 bbb+64 ccc+16 0:100:sequence.fasta 100:80:metadata.yaml\n"
        );
    }

    #[test]
    fn hex_digest_is_lowercase_sha256() {
        let digest = hex(&Sha256::digest(b"abc"));
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn read_block_fills_buffer_from_fragmented_reader() {
        struct OneByte<'a>(&'a [u8]);
        impl Read for OneByte<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }
        let mut buf = [0u8; 4];
        let mut reader = OneByte(b"abcdef");
        assert_eq!(read_block(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(read_block(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
    }
}
