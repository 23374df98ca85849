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

use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Mutex;
use std::sync::MutexGuard;

use chunksign_core::hash::hex_hmac_sha256;
use chunksign_core::utils::Redact;
use chunksign_core::Error;
use chunksign_core::Result;
use log::debug;

/// RollingSigner chains HMAC-SHA256 signatures.
///
/// Every signature is computed over a string to sign that embeds the previous signature,
/// starting from the seed signature produced by header or query signing. The resulting
/// sequence attests the content and the order of everything signed so far.
///
/// One signer serves exactly one logical stream. It is usually shared between the chunk
/// extension provider and the trailer provider of that stream.
pub struct RollingSigner {
    signing_key: Vec<u8>,
    seed_signature: String,
    previous_signature: Mutex<String>,
}

impl Debug for RollingSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let key = hex::encode(&self.signing_key);
        f.debug_struct("RollingSigner")
            .field("signing_key", &Redact::from(&key))
            .field("seed_signature", &self.seed_signature)
            .finish_non_exhaustive()
    }
}

impl RollingSigner {
    /// Create a new signer anchored at `seed_signature`.
    pub fn new(signing_key: impl Into<Vec<u8>>, seed_signature: impl Into<String>) -> Result<Self> {
        let signing_key = signing_key.into();
        let seed_signature = seed_signature.into();
        if signing_key.is_empty() {
            return Err(Error::config_invalid("signing key must not be empty"));
        }
        if seed_signature.is_empty() {
            return Err(Error::config_invalid("seed signature must not be empty"));
        }

        Ok(Self {
            signing_key,
            previous_signature: Mutex::new(seed_signature.clone()),
            seed_signature,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, String>> {
        self.previous_signature
            .lock()
            .map_err(|_| Error::unexpected("rolling signer lock poisoned"))
    }

    /// Sign the string built by `template` from the previous signature.
    ///
    /// The returned hex signature becomes the previous signature of the next call.
    pub fn sign(&self, template: impl FnOnce(&str) -> String) -> Result<String> {
        let mut previous = self.lock()?;
        let string_to_sign = template(&previous);
        debug!("calculated string to sign: {string_to_sign}");

        let signature = hex_hmac_sha256(&self.signing_key, string_to_sign.as_bytes());
        previous.clone_from(&signature);
        Ok(signature)
    }

    /// The signature the next call to [`sign`](Self::sign) chains from.
    pub fn current_signature(&self) -> Result<String> {
        Ok(self.lock()?.clone())
    }

    /// The signature this signer is anchored at.
    pub fn seed_signature(&self) -> &str {
        &self.seed_signature
    }

    /// Restart the chain from the seed signature.
    pub fn reset(&self) -> Result<()> {
        self.lock()?.clone_from(&self.seed_signature);
        Ok(())
    }
}
