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

use chunksign_core::hash::hmac_sha256;
use chunksign_core::time::format_date;
use chunksign_core::time::format_iso8601;
use chunksign_core::time::DateTime;

/// CredentialScope narrows a derived signing key to a date, a region and a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialScope {
    region: String,
    service: String,
    time: DateTime,
}

impl CredentialScope {
    /// Create a new credential scope.
    pub fn new(region: &str, service: &str, time: DateTime) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
            time,
        }
    }

    /// Region of this scope.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service of this scope.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Signing time of this scope.
    pub fn time(&self) -> DateTime {
        self.time
    }

    /// Signing date: `20220313`
    pub fn date(&self) -> String {
        format_date(self.time)
    }

    /// Signing datetime: `20220313T072004Z`
    pub fn datetime(&self) -> String {
        format_iso8601(self.time)
    }

    /// Scope: `20220313/<region>/<service>/aws4_request`
    pub fn scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date(),
            self.region,
            self.service
        )
    }
}

/// Derive the SigV4 signing key for `scope` from a secret access key.
pub fn generate_signing_key(secret: &str, scope: &CredentialScope) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), scope.date().as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), scope.region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), scope.service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
