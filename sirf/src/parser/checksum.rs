use crate::{constants::SIRF_CHECKSUM_MASK, ParserError};

/// SiRF checksum: 15-bit sum of the payload bytes.
#[derive(Default, Clone, Copy)]
pub(crate) struct SirfChecksumCalc {
    sum: u16,
}

impl SirfChecksumCalc {
    pub(crate) const fn new() -> Self {
        Self { sum: 0 }
    }

    pub(crate) const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.sum = self.sum.wrapping_add(bytes[i] as u16) & SIRF_CHECKSUM_MASK;
            i += 1;
        }
    }

    pub(crate) const fn result(self) -> u16 {
        self.sum
    }

    pub(crate) const fn validate_result(self, received: u16) -> Result<(), ParserError> {
        if self.sum == received {
            Ok(())
        } else {
            Err(ParserError::InvalidChecksum {
                expect: received,
                got: self.sum,
            })
        }
    }
}

/// Checksum of a complete payload.
pub fn sirf_checksum(payload: &[u8]) -> u16 {
    let mut calc = SirfChecksumCalc::new();
    calc.update(payload);
    calc.result()
}

/// UBX [Fletcher-16 checksum](https://en.wikipedia.org/wiki/Fletcher%27s_checksum),
/// only needed to recognise u-blox receivers.
#[derive(Default)]
pub(crate) struct UbxChecksumCalc {
    ck_a: u8,
    ck_b: u8,
}

impl UbxChecksumCalc {
    pub(crate) const fn new() -> Self {
        Self { ck_a: 0, ck_b: 0 }
    }

    pub(crate) const fn update(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            self.ck_a = self.ck_a.wrapping_add(bytes[i]);
            self.ck_b = self.ck_b.wrapping_add(self.ck_a);
            i += 1;
        }
    }

    pub(crate) const fn validate_result(
        self,
        received_ck_a: u8,
        received_ck_b: u8,
    ) -> Result<(), ParserError> {
        if self.ck_a == received_ck_a && self.ck_b == received_ck_b {
            Ok(())
        } else {
            Err(ParserError::InvalidChecksum {
                expect: u16::from_le_bytes([received_ck_a, received_ck_b]),
                got: u16::from_le_bytes([self.ck_a, self.ck_b]),
            })
        }
    }
}

/// NMEA checksum: xor of everything between `$` and `*`.
pub fn nmea_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Validates a complete `$...*hh` sentence. Sentences without a `*` carry
/// no checksum and are accepted.
pub(crate) fn validate_nmea(sentence: &[u8]) -> Result<(), ParserError> {
    let Some(star) = sentence.iter().position(|&b| b == b'*') else {
        return Ok(());
    };
    let body = sentence.get(1..star).unwrap_or(&[]);
    let got = u16::from(nmea_checksum(body));
    let digits = sentence.get(star + 1..star + 3);
    let expect = match digits {
        Some(&[hi, lo]) => match (hex_value(hi), hex_value(lo)) {
            (Some(hi), Some(lo)) => u16::from((hi << 4) | lo),
            _ => u16::MAX,
        },
        _ => u16::MAX,
    };
    if expect == got {
        Ok(())
    } else {
        Err(ParserError::InvalidChecksum { expect, got })
    }
}
