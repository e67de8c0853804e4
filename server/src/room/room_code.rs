use rand::Rng;

pub const ROOM_CODE_LEN: usize = 6;
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random uppercase base-36 code, short enough to read out to a friend.
pub fn generate_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Draws codes until one is not taken by a live room.
pub fn generate_unique_room_code<R, F>(rng: &mut R, is_taken: F) -> String
where
    R: Rng + ?Sized,
    F: Fn(&str) -> bool,
{
    loop {
        let code = generate_room_code(rng);
        if !is_taken(&code) {
            return code;
        }
    }
}

/// Codes are typed by hand, so tolerate stray whitespace and lowercase.
pub fn normalize_room_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}
