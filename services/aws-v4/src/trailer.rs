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

use chunksign_core::chunked::Trailer;
use chunksign_core::chunked::TrailerProvider;
use chunksign_core::hash::hex_sha256;
use chunksign_core::Result;
use log::debug;

use crate::canonical::canonical_headers_string;
use crate::constants::AWS4_HMAC_SHA256_TRAILER;
use crate::constants::X_AMZ_TRAILER_SIGNATURE;
use crate::CredentialScope;
use crate::RollingSigner;

/// SigV4TrailerProvider signs the trailers rendered before it.
///
/// The signature chains from the signature of the final chunk, so the signer must be the
/// one shared with the stream's [`SigV4ChunkExtensionProvider`](crate::SigV4ChunkExtensionProvider).
/// It must be added as the last trailer of a payload.
#[derive(Debug, Clone)]
pub struct SigV4TrailerProvider {
    trailers: Vec<Arc<dyn TrailerProvider>>,
    signer: Arc<RollingSigner>,
    credential_scope: CredentialScope,
}

impl SigV4TrailerProvider {
    /// Create a new provider signing `trailers`.
    pub fn new(
        trailers: Vec<Arc<dyn TrailerProvider>>,
        signer: Arc<RollingSigner>,
        credential_scope: CredentialScope,
    ) -> Self {
        Self {
            trailers,
            signer,
            credential_scope,
        }
    }
}

impl TrailerProvider for SigV4TrailerProvider {
    fn get(&self) -> Result<Trailer> {
        let trailers = self
            .trailers
            .iter()
            .map(|t| t.get())
            .collect::<Result<Vec<_>>>()?;
        let canonical = canonical_headers_string(&trailers)?;
        debug!("calculated canonical trailers: {canonical}");

        let datetime = self.credential_scope.datetime();
        let scope = self.credential_scope.scope();
        let trailers_hash = hex_sha256(canonical.as_bytes());

        // StringToSign:
        //
        // AWS4-HMAC-SHA256-TRAILER
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <previous_signature>
        // <hashed_canonical_trailers>
        let signature = self.signer.sign(|previous| {
            format!("{AWS4_HMAC_SHA256_TRAILER}\n{datetime}\n{scope}\n{previous}\n{trailers_hash}")
        })?;

        Ok(Trailer::new(X_AMZ_TRAILER_SIGNATURE, vec![signature]))
    }

    fn reset(&self) -> Result<()> {
        for trailer in &self.trailers {
            trailer.reset()?;
        }
        self.signer.reset()
    }
}
