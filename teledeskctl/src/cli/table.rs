//! Plain-text table rendering for the user listing.

use std::collections::HashMap;

use teledesk_model::{Address, User, UserId};

const STATIC_HEADERS: [&str; 9] = [
    "ID",
    "TG UID",
    "First name",
    "Last name",
    "TG username",
    "Photo URL",
    "Role",
    "Registered",
    "Addresses",
];

/// Render users as an aligned table: the fixed schema columns first, then
/// one column per dynamic extra-field key.
pub fn render_users(
    users: &[User],
    dynamic_keys: &[String],
    addresses: &HashMap<UserId, Vec<Address>>,
) -> String {
    let mut headers: Vec<String> = STATIC_HEADERS.iter().map(|h| h.to_string()).collect();
    headers.extend(dynamic_keys.iter().cloned());

    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|user| {
            let mut row = vec![
                user.id.to_string(),
                user.telegram_uid.to_string(),
                user.first_name.clone(),
                user.last_name.clone(),
                user.tg_username.clone().unwrap_or_default(),
                user.photo_url.clone().unwrap_or_default(),
                user.role_id.to_string(),
                user.created_at.format("%Y-%m-%d %H:%M").to_string(),
                addresses
                    .get(&user.id)
                    .map(|list| {
                        list.iter()
                            .map(format_address)
                            .collect::<Vec<String>>()
                            .join(" | ")
                    })
                    .unwrap_or_default(),
            ];
            row.extend(
                dynamic_keys
                    .iter()
                    .map(|key| user.extra_fields.get(key).cloned().unwrap_or_default()),
            );
            row
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let padding = width - cell.chars().count();
            format!("{cell}{}", " ".repeat(padding))
        })
        .collect::<Vec<String>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// One-line address rendering for table cells and grouped listings.
pub fn format_address(address: &Address) -> String {
    let mut line = format!(
        "{}, {}, {} {}",
        address.country, address.city, address.street, address.building
    );
    if let Some(appartment) = &address.appartment {
        line.push_str(&format!(", apt {appartment}"));
    }
    line.push_str(&format!("; {}", address.postal_code));
    line
}
