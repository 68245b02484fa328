use rand::seq::SliceRandom;
use rand::thread_rng;

use memeclash_protocol::Card;

use crate::content::CardTemplate;

/// Build a shuffled deck covering `required_size` cards. The catalog is
/// replicated whole, so the result length is the smallest multiple of
/// the catalog size at or above `required_size` and every template is
/// represented the same number of times. Instance ids are unique within
/// one build.
pub fn build(catalog: &[CardTemplate], required_size: usize) -> Vec<Card> {
    if catalog.is_empty() {
        return Vec::new();
    }
    let mut cards = Vec::new();
    let mut counter = 0usize;
    while cards.len() < required_size {
        for template in catalog {
            cards.push(Card {
                id: format!("{}-{}", template.id, counter),
                label: template.label.clone(),
                image_url: template.image_url.clone(),
            });
            counter += 1;
        }
    }
    cards.shuffle(&mut thread_rng());
    cards
}
