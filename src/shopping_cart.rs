use askama::Template;
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;

pub const EXPORT_CONTENT_DISPOSITION: &str = "attachment; filename=\"shopping_cart.txt\"";

/// One ingredient amount taken from a recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Summed amount for one (name, unit) pair.
///
/// Totals are widened to `i128` so no combination of stored amounts overflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i128,
}

#[derive(Template)]
#[template(path = "shopping_cart.txt")]
struct ShoppingCartTemplate<'a> {
    lines: &'a [CartLine],
}

/// Groups items by (name, unit) and sums their amounts.
///
/// Output is sorted by name, then unit, whatever the input order.
pub fn aggregate(items: impl IntoIterator<Item = CartItem>) -> Vec<CartLine> {
    let mut totals: BTreeMap<(String, String), i128> = BTreeMap::new();
    for item in items {
        *totals.entry((item.name, item.measurement_unit)).or_insert(0) += i128::from(item.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| CartLine {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub async fn fetch_cart_items(db: &SqlitePool, user_id: &str) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT i.name, i.measurement_unit, ia.amount
        FROM shopping_cart sc
        JOIN ingredient_amounts ia ON ia.recipe_id = sc.recipe_id
        JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE sc.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn cart_lines(db: &SqlitePool, user_id: &str) -> Result<Vec<CartLine>, sqlx::Error> {
    Ok(aggregate(fetch_cart_items(db, user_id).await?))
}

/// Renders `- {name} ({unit}) — {total}` lines joined by newlines.
pub fn render(lines: &[CartLine]) -> Result<String, askama::Error> {
    ShoppingCartTemplate { lines }.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, amount: i64) -> CartItem {
        CartItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn line(name: &str, unit: &str, total: i128) -> CartLine {
        CartLine {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        }
    }

    #[test]
    fn sums_across_recipes() {
        // Recipe 1: flour 200 g, sugar 50 g. Recipe 2: flour 100 g.
        let lines = aggregate(vec![
            item("Flour", "g", 200),
            item("Sugar", "g", 50),
            item("Flour", "g", 100),
        ]);
        assert_eq!(lines, vec![line("Flour", "g", 300), line("Sugar", "g", 50)]);
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let lines = aggregate(vec![item("Milk", "ml", 200), item("Milk", "cup", 1)]);
        assert_eq!(lines, vec![line("Milk", "cup", 1), line("Milk", "ml", 200)]);
    }

    #[test]
    fn input_order_does_not_matter() {
        let items = vec![
            item("Eggs", "pcs", 2),
            item("Butter", "g", 30),
            item("Eggs", "pcs", 3),
            item("Salt", "pinch", 1),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        assert_eq!(aggregate(items), aggregate(reversed));
    }

    #[test]
    fn huge_amounts_do_not_overflow() {
        let items = vec![item("Flour", "g", i64::MAX), item("Flour", "g", 1)];
        let mut reversed = items.clone();
        reversed.reverse();

        let expected = vec![line("Flour", "g", i128::from(i64::MAX) + 1)];
        assert_eq!(aggregate(items), expected);
        assert_eq!(aggregate(reversed), expected);

        let text = render(&expected).unwrap();
        assert_eq!(text, "- Flour (g) — 9223372036854775808");
    }

    #[test]
    fn renders_one_line_per_group() {
        let text = render(&[line("Flour", "g", 300), line("Sugar", "g", 50)]).unwrap();
        assert_eq!(text, "- Flour (g) — 300\n- Sugar (g) — 50");
    }

    #[test]
    fn empty_cart_renders_empty_text() {
        assert_eq!(aggregate(Vec::new()), Vec::new());
        assert_eq!(render(&[]).unwrap(), "");
    }

    #[test]
    fn rendering_does_not_escape() {
        let text = render(&[line("Salt & pepper", "<pinch>", 1)]).unwrap();
        assert_eq!(text, "- Salt & pepper (<pinch>) — 1");
    }
}
