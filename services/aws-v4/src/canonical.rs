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

use std::fmt::Write;

use chunksign_core::chunked::Trailer;
use chunksign_core::Error;
use chunksign_core::Result;
use http::header::HeaderName;
use http::HeaderMap;
use http::HeaderValue;

/// Build the SigV4 canonical headers string of `trailers`.
///
/// Names are lower-cased and sorted, values are trimmed with inner runs of spaces
/// collapsed, repeated names are joined with `,`. Every header ends with `\n`:
///
/// ```text
/// x-amz-checksum-sha256:uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=
/// zzz:123
/// ```
pub fn canonical_headers_string(trailers: &[Trailer]) -> Result<String> {
    let mut headers = HeaderMap::new();
    for trailer in trailers {
        let name = HeaderName::from_bytes(trailer.name.as_bytes())?;
        for value in &trailer.values {
            headers.append(name.clone(), HeaderValue::from_str(&normalize_value(value))?);
        }
    }

    let mut names = headers.keys().map(|k| k.as_str()).collect::<Vec<&str>>();
    names.sort_unstable();

    let mut f = String::with_capacity(128);
    for name in names {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        writeln!(f, "{}:{}", name, values.join(","))
            .map_err(|e| Error::unexpected(format!("failed to write header: {e}")))?;
    }

    Ok(f)
}

fn normalize_value(value: &str) -> String {
    value.split(' ').filter(|v| !v.is_empty()).collect::<Vec<_>>().join(" ")
}
