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

use std::sync::Arc;

use chunksign_core::chunked::ChunkExtension;
use chunksign_core::chunked::ChunkExtensionProvider;
use chunksign_core::hash::hex_sha256;
use chunksign_core::hash::EMPTY_STRING_SHA256;
use chunksign_core::Result;

use crate::constants::AWS4_HMAC_SHA256_PAYLOAD;
use crate::constants::CHUNK_SIGNATURE;
use crate::CredentialScope;
use crate::RollingSigner;

/// SigV4ChunkExtensionProvider signs every chunk, producing `chunk-signature=<hex>`.
#[derive(Debug, Clone)]
pub struct SigV4ChunkExtensionProvider {
    signer: Arc<RollingSigner>,
    credential_scope: CredentialScope,
}

impl SigV4ChunkExtensionProvider {
    /// Create a new provider signing with `signer`.
    pub fn new(signer: Arc<RollingSigner>, credential_scope: CredentialScope) -> Self {
        Self {
            signer,
            credential_scope,
        }
    }
}

impl ChunkExtensionProvider for SigV4ChunkExtensionProvider {
    fn get(&self, chunk: &[u8]) -> Result<ChunkExtension> {
        let datetime = self.credential_scope.datetime();
        let scope = self.credential_scope.scope();
        let chunk_hash = hex_sha256(chunk);

        // StringToSign:
        //
        // AWS4-HMAC-SHA256-PAYLOAD
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <previous_signature>
        // <hashed_empty_string>
        // <hashed_chunk>
        let signature = self.signer.sign(|previous| {
            format!(
                "{AWS4_HMAC_SHA256_PAYLOAD}\n{datetime}\n{scope}\n{previous}\n{EMPTY_STRING_SHA256}\n{chunk_hash}"
            )
        })?;

        Ok(ChunkExtension::new(CHUNK_SIGNATURE, signature))
    }

    fn reset(&self) -> Result<()> {
        self.signer.reset()
    }
}
