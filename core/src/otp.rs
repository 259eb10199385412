// One-time password generation
//
// Six characters drawn from one of three alphabets. The OTP travels out of
// band (SMS) and doubles as the envelope key material.

use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// OTP length in characters.
pub const OTP_LENGTH: usize = 6;

/// Alphabet the OTP is sampled from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OtpKind {
    /// Digits 0-9.
    #[default]
    Numeric,
    /// Uppercase letters A-Z.
    Letters,
    /// Uppercase letters and digits.
    Alphanumeric,
}

impl OtpKind {
    fn alphabet(self) -> &'static [u8] {
        match self {
            OtpKind::Numeric => b"0123456789",
            OtpKind::Letters => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            OtpKind::Alphanumeric => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789",
        }
    }

    /// True when every character of `otp` belongs to this alphabet.
    pub fn matches(self, otp: &str) -> bool {
        otp.bytes().all(|b| self.alphabet().contains(&b))
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpKind::Numeric => write!(f, "numeric"),
            OtpKind::Letters => write!(f, "letters"),
            OtpKind::Alphanumeric => write!(f, "alphanumeric"),
        }
    }
}

impl FromStr for OtpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "numeric" => Ok(OtpKind::Numeric),
            "letters" => Ok(OtpKind::Letters),
            "alphanumeric" => Ok(OtpKind::Alphanumeric),
            other => Err(format!(
                "invalid OTP kind {:?}; choose numeric, letters, or alphanumeric",
                other
            )),
        }
    }
}

/// Sample a fresh 6-character OTP.
pub fn generate(kind: OtpKind) -> String {
    let alphabet = kind.alphabet();
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}
