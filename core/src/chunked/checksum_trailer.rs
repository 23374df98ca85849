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

use super::Trailer;
use super::TrailerProvider;
use crate::checksum::SharedChecksum;
use crate::hash::base64_encode;
use crate::Result;

/// ChecksumTrailerProvider reports a running checksum as a base64 trailer.
///
/// The checksum must be teed into the payload before encoding starts, see
/// [`ChunkedEncodedPayload::checksum_payload`](super::ChunkedEncodedPayload::checksum_payload).
#[derive(Debug, Clone)]
pub struct ChecksumTrailerProvider {
    checksum: SharedChecksum,
    header_name: String,
}

impl ChecksumTrailerProvider {
    /// Create a provider emitting `header_name:<base64 digest>`.
    pub fn new(checksum: SharedChecksum, header_name: impl Into<String>) -> Self {
        Self {
            checksum,
            header_name: header_name.into(),
        }
    }
}

impl TrailerProvider for ChecksumTrailerProvider {
    fn get(&self) -> Result<Trailer> {
        let digest = self.checksum.checksum_bytes()?;
        Ok(Trailer::new(
            self.header_name.clone(),
            vec![base64_encode(&digest)],
        ))
    }

    fn reset(&self) -> Result<()> {
        self.checksum.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumAlgorithm;

    #[test]
    fn test_checksum_trailer() -> anyhow::Result<()> {
        let checksum = SharedChecksum::from_algorithm(ChecksumAlgorithm::Sha256);
        let provider = ChecksumTrailerProvider::new(
            checksum.clone(),
            ChecksumAlgorithm::Sha256.header_name(),
        );

        checksum.update(b"hello world")?;
        assert_eq!(
            provider.get()?,
            Trailer::new(
                "x-amz-checksum-sha256",
                vec!["uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=".to_string()]
            )
        );

        provider.reset()?;
        assert_eq!(
            provider.get()?.values,
            vec!["47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=".to_string()]
        );
        Ok(())
    }
}
