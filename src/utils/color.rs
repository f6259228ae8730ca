// src/utils/color.rs

use rand::Rng;

/// Number of leaderboard rows that get a colour assigned per session.
pub const PALETTE_SIZE: usize = 5;

/// A light pastel colour, each channel in 150..=255.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let r: u8 = rng.random_range(150..=255);
    let g: u8 = rng.random_range(150..=255);
    let b: u8 = rng.random_range(150..=255);
    format!("rgb({},{},{})", r, g, b)
}

pub fn palette<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    (0..PALETTE_SIZE).map(|_| random_color(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_stay_in_pastel_range() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let color = random_color(&mut rng);
            let inner = color
                .strip_prefix("rgb(")
                .and_then(|c| c.strip_suffix(')'))
                .unwrap();
            for channel in inner.split(',') {
                let value: u16 = channel.parse().unwrap();
                assert!((150..=255).contains(&value));
            }
        }
    }

    #[test]
    fn palette_has_one_colour_per_top_row() {
        assert_eq!(palette(&mut rand::rng()).len(), PALETTE_SIZE);
    }
}
