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

//! The 8-byte preamble every serialized sketch starts with.
//!
//! ```text
//! byte 0    preamble longs
//! byte 1    serial version
//! byte 2    family id
//! byte 3    hash scheme id
//! byte 4    flags
//! byte 5    reserved, always 0
//! bytes 6-7 family specific u16 parameter, little-endian
//! ```

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::error::Error;

pub(crate) const SERIAL_VERSION: u8 = 1;
pub(crate) const EMPTY_FLAG_MASK: u8 = 1 << 2;
const KNOWN_FLAGS: u8 = EMPTY_FLAG_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Preamble {
    pub hash_scheme_id: u8,
    pub is_empty: bool,
    pub param: u16,
}

impl Preamble {
    pub fn write(&self, family: &Family, bytes: &mut SketchBytes) {
        bytes.write_u8(family.pre_longs);
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(family.id);
        bytes.write_u8(self.hash_scheme_id);
        bytes.write_u8(if self.is_empty { EMPTY_FLAG_MASK } else { 0 });
        bytes.write_u8(0); // reserved
        bytes.write_u16_le(self.param);
    }

    pub fn read(family: &Family, cursor: &mut SketchSlice<'_>) -> Result<Preamble, Error> {
        let pre_longs = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("preamble_longs"))?;
        let serial_version = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("serial_version"))?;
        let family_id = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("family_id"))?;

        family.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(
                SERIAL_VERSION,
                serial_version,
            ));
        }
        family.validate_pre_longs(pre_longs)?;

        let hash_scheme_id = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("hash_scheme"))?;
        let flags = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("flags"))?;
        if flags & !KNOWN_FLAGS != 0 {
            return Err(Error::deserial(format!("unknown flags: {flags:#04x}")));
        }
        let reserved = cursor
            .read_u8()
            .map_err(|_| Error::insufficient_data("reserved"))?;
        if reserved != 0 {
            return Err(Error::deserial(format!(
                "reserved byte must be 0, got {reserved}"
            )));
        }
        let param = cursor
            .read_u16_le()
            .map_err(|_| Error::insufficient_data("param"))?;

        Ok(Preamble {
            hash_scheme_id,
            is_empty: flags & EMPTY_FLAG_MASK != 0,
            param,
        })
    }
}

/// Fails if the cursor still holds bytes after the payload.
pub(crate) fn ensure_consumed(cursor: &SketchSlice<'_>, family: &Family) -> Result<(), Error> {
    match cursor.remaining() {
        0 => Ok(()),
        extra => Err(Error::deserial(format!(
            "{extra} trailing bytes after {} payload",
            family.name
        ))),
    }
}
