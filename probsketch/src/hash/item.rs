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

use std::borrow::Cow;

/// An item that can be reduced to a canonical byte sequence for hashing.
///
/// Sketches never look at an item's type, only at these bytes. Two items with
/// the same bytes are the same item:
///
/// - strings hash their UTF-8 bytes;
/// - byte slices, vectors and arrays hash themselves;
/// - integers hash their decimal rendering, so `42_u32` and `"42"` collide on
///   purpose;
/// - `bool` hashes `"true"` / `"false"` and `char` its UTF-8 encoding.
///
/// Implement this trait for domain types that need a different encoding.
///
/// # Examples
///
/// ```
/// use probsketch::hash::ItemBytes;
///
/// assert_eq!(&*"42".item_bytes(), b"42");
/// assert_eq!(42_u64.item_bytes(), "42".item_bytes());
/// assert_eq!(&*[1u8, 2, 3].item_bytes(), &[1, 2, 3]);
/// ```
pub trait ItemBytes {
    /// Returns the canonical bytes of this item.
    fn item_bytes(&self) -> Cow<'_, [u8]>;
}

impl<T: ItemBytes + ?Sized> ItemBytes for &T {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        (**self).item_bytes()
    }
}

impl ItemBytes for str {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl ItemBytes for String {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl ItemBytes for [u8] {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl ItemBytes for Vec<u8> {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl<const N: usize> ItemBytes for [u8; N] {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl ItemBytes for bool {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        let text: &'static str = if *self { "true" } else { "false" };
        Cow::Borrowed(text.as_bytes())
    }
}

impl ItemBytes for char {
    fn item_bytes(&self) -> Cow<'_, [u8]> {
        let mut buf = [0u8; 4];
        Cow::Owned(self.encode_utf8(&mut buf).as_bytes().to_vec())
    }
}

macro_rules! impl_item_bytes_for_integers {
    ($($t:ty),*) => {
        $(
            impl ItemBytes for $t {
                fn item_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_string().into_bytes())
                }
            }
        )*
    };
}

impl_item_bytes_for_integers!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
