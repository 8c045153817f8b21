use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::commands::giveaway::models::{PrizeItem, Winner};

// The weighted without-replacement draw.
//
// Participants are shuffled into a uniformly random order (and cut to
// `max_winners` when a cap is set), then each one in turn picks a single
// item among those with remaining stock, with probability proportional
// to the item weights. The draw stops as soon as the inventory or the
// total weight runs out, so every participant gets at most one prize
// and no item is handed out beyond its quantity.
pub fn draw(participants: &HashSet<u64>, items: &[PrizeItem], max_winners: u32) -> Vec<Winner> {
    draw_with(participants, items, max_winners, &mut rand::thread_rng())
}

pub fn draw_with<R: Rng + ?Sized>(
    participants: &HashSet<u64>,
    items: &[PrizeItem],
    max_winners: u32,
    rng: &mut R,
) -> Vec<Winner> {
    let mut order = participants.iter().copied().collect::<Vec<u64>>();
    order.shuffle(rng);
    if max_winners > 0 {
        order.truncate(max_winners as usize);
    }

    let mut remaining = items.iter().map(|item| item.quantity).collect::<Vec<u32>>();
    let mut winners = Vec::new();

    for user_id in order {
        let available = items
            .iter()
            .enumerate()
            .filter(|(index, _)| remaining[*index] > 0)
            .collect::<Vec<(usize, &PrizeItem)>>();

        let total_weight = available
            .iter()
            .map(|(_, item)| item.weight as u64)
            .sum::<u64>();
        if available.is_empty() || total_weight == 0 {
            break;
        }

        let mut roll = rng.gen_range(0..total_weight);
        for (index, item) in available {
            let weight = item.weight as u64;
            if roll < weight {
                remaining[index] -= 1;
                winners.push(Winner {
                    user_id,
                    item_name: item.name.clone(),
                });
                break;
            }
            roll -= weight;
        }
    }

    winners
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::commands::giveaway::draw::{draw, draw_with};
    use crate::commands::giveaway::models::PrizeItem;

    fn participants(amount: u64) -> HashSet<u64> {
        (1..=amount).collect()
    }

    #[test]
    fn test_two_items_and_two_participants_get_one_item_each() {
        let items = vec![
            PrizeItem::new("A", 1, 50),
            PrizeItem::new("B", 1, 50),
        ];

        let winners = draw(&participants(2), &items, 0);
        assert_eq!(winners.len(), 2);

        let item_names = winners
            .iter()
            .map(|winner| winner.item_name.as_str())
            .collect::<HashSet<&str>>();
        assert_eq!(item_names.contains("A"), true);
        assert_eq!(item_names.contains("B"), true);
    }

    #[test]
    fn test_single_unit_gives_exactly_one_winner() {
        let items = vec![PrizeItem::new("A", 1, 100)];

        let winners = draw(&participants(5), &items, 0);
        assert_eq!(winners.len(), 1);
    }

    #[test]
    fn test_no_user_wins_twice() {
        let items = vec![PrizeItem::new("A", 100, 50)];

        let winners = draw(&participants(10), &items, 0);
        assert_eq!(winners.len(), 10);

        let unique_users = winners
            .iter()
            .map(|winner| winner.user_id)
            .collect::<HashSet<u64>>();
        assert_eq!(unique_users.len(), 10);
    }

    #[test]
    fn test_item_is_never_assigned_beyond_its_quantity() {
        let items = vec![
            PrizeItem::new("A", 2, 90),
            PrizeItem::new("B", 3, 10),
        ];

        for _ in 0..200 {
            let winners = draw(&participants(10), &items, 0);
            assert_eq!(winners.len() <= 5, true);

            for item in &items {
                let assigned = winners
                    .iter()
                    .filter(|winner| winner.item_name == item.name)
                    .count();
                assert_eq!(assigned <= item.quantity as usize, true);
            }
        }
    }

    #[test]
    fn test_winners_are_capped_by_max_winners() {
        let items = vec![PrizeItem::new("A", 100, 50)];

        let winners = draw(&participants(10), &items, 3);
        assert_eq!(winners.len(), 3);
    }

    #[test]
    fn test_no_participants_means_no_winners() {
        let items = vec![PrizeItem::new("A", 5, 50)];

        let winners = draw(&HashSet::new(), &items, 0);
        assert_eq!(winners.is_empty(), true);
    }

    #[test]
    fn test_empty_inventory_means_no_winners() {
        let winners = draw(&participants(5), &[], 0);
        assert_eq!(winners.is_empty(), true);
    }

    #[test]
    fn test_zero_weights_stop_the_draw() {
        let items = vec![
            PrizeItem::new("A", 5, 0),
            PrizeItem::new("B", 5, 0),
        ];

        let winners = draw(&participants(5), &items, 0);
        assert_eq!(winners.is_empty(), true);
    }

    #[test]
    fn test_exhausted_item_passes_weight_to_the_rest() {
        // A single unit of the heavy item, the rest must fall through
        // to the otherwise unlikely one.
        let items = vec![
            PrizeItem::new("A", 1, 99),
            PrizeItem::new("B", 4, 1),
        ];

        let winners = draw(&participants(5), &items, 0);
        assert_eq!(winners.len(), 5);
        let b_assigned = winners
            .iter()
            .filter(|winner| winner.item_name == "B")
            .count();
        assert_eq!(b_assigned, 4);
    }

    #[test]
    fn test_equal_weights_converge_to_equal_frequencies() {
        let items = vec![
            PrizeItem::new("A", 1_000_000, 50),
            PrizeItem::new("B", 1_000_000, 50),
        ];
        let single_participant = participants(1);
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 10_000;
        let mut a_picked = 0usize;
        for _ in 0..trials {
            let winners = draw_with(&single_participant, &items, 0, &mut rng);
            assert_eq!(winners.len(), 1);
            if winners[0].item_name == "A" {
                a_picked += 1;
            }
        }

        // 50% within a generous statistical tolerance.
        assert_eq!(a_picked > 4_500, true, "A picked {a_picked} times");
        assert_eq!(a_picked < 5_500, true, "A picked {a_picked} times");
    }

    #[test]
    fn test_weight_ratio_is_respected() {
        let items = vec![
            PrizeItem::new("A", 1_000_000, 90),
            PrizeItem::new("B", 1_000_000, 10),
        ];
        let single_participant = participants(1);
        let mut rng = StdRng::seed_from_u64(7);

        let trials = 10_000;
        let mut a_picked = 0usize;
        for _ in 0..trials {
            let winners = draw_with(&single_participant, &items, 0, &mut rng);
            if winners[0].item_name == "A" {
                a_picked += 1;
            }
        }

        assert_eq!(a_picked > 8_700, true, "A picked {a_picked} times");
        assert_eq!(a_picked < 9_300, true, "A picked {a_picked} times");
    }
}
