// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Running checksums over payload bytes.

use std::fmt::Debug;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crc_fast::CrcAlgorithm;
use crc_fast::Digest;
use sha1::Sha1;
use sha2::Digest as _;
use sha2::Sha256;

use crate::Error;
use crate::Result;

/// Checksum is a running digest that observes payload bytes as they flow.
pub trait Checksum: Debug + Send + 'static {
    /// Feed more bytes into the checksum.
    fn update(&mut self, data: &[u8]);

    /// Digest of all bytes observed since creation or the last reset.
    ///
    /// This must not consume the running state.
    fn checksum_bytes(&self) -> Vec<u8>;

    /// Forget every observed byte.
    fn reset(&mut self);
}

/// Checksum algorithms that can be carried as an `x-amz-checksum-*` trailer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// CRC-32 (ISO-HDLC)
    #[default]
    Crc32,
    /// CRC-32C (Castagnoli)
    Crc32c,
    /// CRC-64/NVME
    Crc64Nvme,
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
}

impl ChecksumAlgorithm {
    /// Algorithm id as used by AWS, for example `SHA256`.
    pub fn algorithm_id(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "CRC32",
            ChecksumAlgorithm::Crc32c => "CRC32C",
            ChecksumAlgorithm::Crc64Nvme => "CRC64NVME",
            ChecksumAlgorithm::Sha1 => "SHA1",
            ChecksumAlgorithm::Sha256 => "SHA256",
        }
    }

    /// Header (and trailer) name carrying this checksum.
    pub fn header_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "x-amz-checksum-crc32",
            ChecksumAlgorithm::Crc32c => "x-amz-checksum-crc32c",
            ChecksumAlgorithm::Crc64Nvme => "x-amz-checksum-crc64nvme",
            ChecksumAlgorithm::Sha1 => "x-amz-checksum-sha1",
            ChecksumAlgorithm::Sha256 => "x-amz-checksum-sha256",
        }
    }

    /// Length of the raw digest in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32c => 4,
            ChecksumAlgorithm::Crc64Nvme => 8,
            ChecksumAlgorithm::Sha1 => 20,
            ChecksumAlgorithm::Sha256 => 32,
        }
    }

    /// Length of the base64 encoded digest.
    pub fn encoded_len(&self) -> usize {
        self.digest_len().div_ceil(3) * 4
    }

    /// Create a fresh checksum for this algorithm.
    pub fn new_checksum(&self) -> Box<dyn Checksum> {
        match self {
            ChecksumAlgorithm::Crc32 => {
                Box::new(CrcChecksum::new(CrcAlgorithm::Crc32IsoHdlc, self.digest_len()))
            }
            ChecksumAlgorithm::Crc32c => {
                Box::new(CrcChecksum::new(CrcAlgorithm::Crc32Iscsi, self.digest_len()))
            }
            ChecksumAlgorithm::Crc64Nvme => {
                Box::new(CrcChecksum::new(CrcAlgorithm::Crc64Nvme, self.digest_len()))
            }
            ChecksumAlgorithm::Sha1 => Box::new(Sha1Checksum::default()),
            ChecksumAlgorithm::Sha256 => Box::new(Sha256Checksum::default()),
        }
    }
}

/// CRC checksum, rendered big-endian in its natural width.
///
/// Created through [`ChecksumAlgorithm::new_checksum`].
#[derive(Clone)]
pub struct CrcChecksum {
    algorithm: CrcAlgorithm,
    width: usize,
    digest: Digest,
}

impl CrcChecksum {
    fn new(algorithm: CrcAlgorithm, width: usize) -> Self {
        Self {
            algorithm,
            width,
            digest: Digest::new(algorithm),
        }
    }
}

impl Debug for CrcChecksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrcChecksum")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl Checksum for CrcChecksum {
    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn checksum_bytes(&self) -> Vec<u8> {
        let crc = self.digest.clone().finalize();
        match self.width {
            4 => (crc as u32).to_be_bytes().to_vec(),
            _ => crc.to_be_bytes().to_vec(),
        }
    }

    fn reset(&mut self) {
        self.digest = Digest::new(self.algorithm);
    }
}

/// SHA-256 checksum.
#[derive(Debug, Default, Clone)]
pub struct Sha256Checksum {
    digest: Sha256,
}

impl Checksum for Sha256Checksum {
    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn checksum_bytes(&self) -> Vec<u8> {
        self.digest.clone().finalize().to_vec()
    }

    fn reset(&mut self) {
        self.digest = Sha256::default();
    }
}

/// SHA-1 checksum.
#[derive(Debug, Default, Clone)]
pub struct Sha1Checksum {
    digest: Sha1,
}

impl Checksum for Sha1Checksum {
    fn update(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    fn checksum_bytes(&self) -> Vec<u8> {
        self.digest.clone().finalize().to_vec()
    }

    fn reset(&mut self) {
        self.digest = Sha1::default();
    }
}

/// A checksum shared between the payload tee and the trailer that reports it.
#[derive(Debug, Clone)]
pub struct SharedChecksum(Arc<Mutex<Box<dyn Checksum>>>);

impl SharedChecksum {
    /// Share the given checksum.
    pub fn new(checksum: Box<dyn Checksum>) -> Self {
        Self(Arc::new(Mutex::new(checksum)))
    }

    /// Create a shared checksum for the given algorithm.
    pub fn from_algorithm(algorithm: ChecksumAlgorithm) -> Self {
        Self::new(algorithm.new_checksum())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Checksum>>> {
        self.0
            .lock()
            .map_err(|_| Error::unexpected("checksum lock poisoned"))
    }

    /// Feed more bytes into the checksum.
    pub fn update(&self, data: &[u8]) -> Result<()> {
        self.lock()?.update(data);
        Ok(())
    }

    /// Digest of all bytes observed so far.
    pub fn checksum_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.lock()?.checksum_bytes())
    }

    /// Forget every observed byte.
    pub fn reset(&self) -> Result<()> {
        self.lock()?.reset();
        Ok(())
    }
}

/// ChecksumReader feeds every byte read from the inner reader into the given checksums.
#[derive(Debug)]
pub struct ChecksumReader<R> {
    inner: R,
    checksums: Vec<SharedChecksum>,
}

impl<R> ChecksumReader<R> {
    /// Wrap `inner`, teeing into `checksums`.
    pub fn new(inner: R, checksums: Vec<SharedChecksum>) -> Self {
        Self { inner, checksums }
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        for checksum in &self.checksums {
            checksum.update(&buf[..n])?;
        }
        Ok(n)
    }
}

impl<R: Seek> Seek for ChecksumReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
