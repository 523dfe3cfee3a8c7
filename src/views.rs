// Parking Vecinal - Server-rendered views
// Plain HTML built in Rust and served via axum's Html responses. Every
// piece of user data passes through escape() before interpolation.

use chrono::{DateTime, Utc};

use crate::entities::{Neighbor, NeighborSummary, Payment, Vehicle};
use crate::flash::Flash;

/// Escape text for interpolation into HTML.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format an amount as display currency: 1234.5 -> "$1,234.56".
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let frac = cents % 100;

    let units = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in units.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let units: String = grouped.chars().rev().collect();

    format!("{}${units}.{frac:02}", if negative { "-" } else { "" })
}

/// Display format for timestamps: "31/12/2024 13:45".
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%d/%m/%Y %H:%M").to_string()
}

fn flash_banner(flash: Option<&Flash>) -> String {
    match flash {
        Some(flash) => format!(
            r#"<div class="flash {}">{}</div>"#,
            flash.level.as_str(),
            escape(&flash.message)
        ),
        None => String::new(),
    }
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{title} - Parking Vecinal</title>
<style>
body {{ font-family: sans-serif; margin: 2rem auto; max-width: 60rem; color: #222; }}
nav a {{ margin-right: 1rem; }}
table {{ border-collapse: collapse; width: 100%; margin: 1rem 0; }}
th, td {{ border: 1px solid #ccc; padding: 0.4rem 0.6rem; text-align: left; }}
form.inline {{ display: inline; }}
.flash {{ padding: 0.6rem 1rem; border-radius: 4px; margin: 1rem 0; }}
.flash.success {{ background: #e5f6e5; color: #1b5e20; }}
.flash.error {{ background: #fdecea; color: #b71c1c; }}
.flash.info {{ background: #e8f0fe; color: #174ea6; }}
label {{ display: block; margin-top: 0.5rem; }}
</style>
</head>
<body>
<nav>
<a href="/">Inicio</a>
<a href="/admin/users">Vecinos</a>
<a href="/portal">Portal</a>
</nav>
<h1>{title}</h1>
{flash}
{body}
</body>
</html>
"#,
        title = escape(title),
        flash = flash_banner(flash),
        body = body,
    )
}

// ============================================================================
// Admin pages
// ============================================================================

pub fn dashboard_page(flash: Option<&Flash>, rows: &[NeighborSummary]) -> String {
    let mut body = String::from(
        "<table>\n<tr><th>Vecino</th><th>Dirección</th><th>Vehículos</th>\
         <th>Pagos</th><th>Alta</th></tr>\n",
    );
    for row in rows {
        body.push_str(&format!(
            "<tr><td><a href=\"/admin/users/{id}/vehicles\">{name}</a></td>\
             <td>{address}</td><td>{vehicles}</td><td>{payments}</td><td>{created}</td></tr>\n",
            id = row.neighbor.id,
            name = escape(&row.neighbor.full_name()),
            address = escape(&row.neighbor.address),
            vehicles = row.vehicle_count,
            payments = row.payment_count,
            created = format_datetime(&row.neighbor.created_at),
        ));
    }
    body.push_str("</table>\n");
    if rows.is_empty() {
        body.push_str("<p>Aún no hay vecinos registrados.</p>\n");
    }

    layout("Tablero", flash, &body)
}

pub fn users_page(flash: Option<&Flash>, neighbors: &[Neighbor]) -> String {
    let mut body = String::from(
        r#"<h2>Registrar vecino</h2>
<form method="post" action="/admin/users">
<label>Nombre <input name="first_name"></label>
<label>Apellido <input name="last_name"></label>
<label>Dirección <input name="address"></label>
<button type="submit">Guardar</button>
</form>
<h2>Vecinos</h2>
<table>
<tr><th>Apellido</th><th>Nombre</th><th>Dirección</th><th></th></tr>
"#,
    );
    for n in neighbors {
        body.push_str(&format!(
            "<tr><td>{last}</td><td>{first}</td><td>{address}</td>\
             <td><a href=\"/admin/users/{id}/vehicles\">Vehículos</a> \
             <a href=\"/admin/users/{id}/payments\">Pagos</a> \
             <form class=\"inline\" method=\"post\" action=\"/admin/users/{id}/delete\">\
             <button type=\"submit\">Eliminar</button></form></td></tr>\n",
            last = escape(&n.last_name),
            first = escape(&n.first_name),
            address = escape(&n.address),
            id = n.id,
        ));
    }
    body.push_str("</table>\n");

    layout("Vecinos", flash, &body)
}

pub fn vehicles_page(flash: Option<&Flash>, neighbor: &Neighbor, vehicles: &[Vehicle]) -> String {
    let mut body = format!(
        r#"<h2>Agregar vehículo</h2>
<form method="post" action="/admin/users/{id}/vehicles">
<label>Placa <input name="license_plate"></label>
<label>Marca <input name="make"></label>
<label>Modelo <input name="model"></label>
<label>Número de control <input name="control_number"></label>
<button type="submit">Guardar</button>
</form>
<h2>Vehículos</h2>
<table>
<tr><th>Placa</th><th>Marca</th><th>Modelo</th><th>Control</th><th>Alta</th><th></th></tr>
"#,
        id = neighbor.id,
    );
    for v in vehicles {
        body.push_str(&format!(
            "<tr><td>{plate}</td><td>{make}</td><td>{model}</td><td>{control}</td>\
             <td>{created}</td>\
             <td><form class=\"inline\" method=\"post\" \
             action=\"/admin/users/{nid}/vehicles/{vid}/delete\">\
             <button type=\"submit\">Eliminar</button></form></td></tr>\n",
            plate = escape(&v.license_plate),
            make = escape(&v.make),
            model = escape(&v.model),
            control = escape(&v.control_number),
            created = format_datetime(&v.created_at),
            nid = neighbor.id,
            vid = v.id,
        ));
    }
    body.push_str("</table>\n");

    layout(
        &format!("Vehículos de {}", neighbor.full_name()),
        flash,
        &body,
    )
}

pub fn payments_page(flash: Option<&Flash>, neighbor: &Neighbor, payments: &[Payment]) -> String {
    let mut body = format!(
        r#"<h2>Registrar pago</h2>
<form method="post" action="/admin/users/{id}/payments" enctype="multipart/form-data">
<label>Método
<select name="method">
<option value="efectivo">Efectivo</option>
<option value="deposito">Depósito</option>
</select>
</label>
<label>Monto <input name="amount"></label>
<label>Cuenta de depósito <input name="deposit_account"></label>
<label>Recibo <input type="file" name="receipt"></label>
<button type="submit">Guardar</button>
</form>
<h2>Pagos</h2>
<table>
<tr><th>Fecha</th><th>Método</th><th>Monto</th><th>Cuenta</th><th>Recibo</th><th></th></tr>
"#,
        id = neighbor.id,
    );
    for p in payments {
        let receipt = match &p.receipt_file {
            Some(file) => format!(
                "<a href=\"/uploads/{file}\">Ver recibo</a>",
                file = escape(file)
            ),
            None => "&mdash;".to_string(),
        };
        body.push_str(&format!(
            "<tr><td>{created}</td><td>{method}</td><td>{amount}</td><td>{account}</td>\
             <td>{receipt}</td>\
             <td><form class=\"inline\" method=\"post\" \
             action=\"/admin/users/{nid}/payments/{pid}/delete\">\
             <button type=\"submit\">Eliminar</button></form></td></tr>\n",
            created = format_datetime(&p.created_at),
            method = escape(&p.method),
            amount = format_currency(p.amount),
            account = escape(p.deposit_account.as_deref().unwrap_or("\u{2014}")),
            receipt = receipt,
            nid = neighbor.id,
            pid = p.id,
        ));
    }
    body.push_str("</table>\n");

    layout(&format!("Pagos de {}", neighbor.full_name()), flash, &body)
}

// ============================================================================
// Resident portal
// ============================================================================

pub fn portal_search_page(
    flash: Option<&Flash>,
    query: &str,
    results: &[NeighborSummary],
) -> String {
    let mut body = format!(
        r#"<form method="post" action="/portal">
<label>Buscar por nombre, apellido o dirección
<input name="query" value="{query}"></label>
<button type="submit">Buscar</button>
</form>
"#,
        query = escape(query),
    );

    if !query.is_empty() {
        if results.is_empty() {
            body.push_str("<p>Sin resultados.</p>\n");
        } else {
            body.push_str(
                "<table>\n<tr><th>Vecino</th><th>Dirección</th><th>Vehículos</th></tr>\n",
            );
            for row in results {
                body.push_str(&format!(
                    "<tr><td><a href=\"/portal/{id}\">{name}</a></td>\
                     <td>{address}</td><td>{vehicles}</td></tr>\n",
                    id = row.neighbor.id,
                    name = escape(&row.neighbor.full_name()),
                    address = escape(&row.neighbor.address),
                    vehicles = row.vehicle_count,
                ));
            }
            body.push_str("</table>\n");
        }
    }

    layout("Portal de residentes", flash, &body)
}

pub fn portal_detail_page(
    flash: Option<&Flash>,
    neighbor: &Neighbor,
    vehicles: &[Vehicle],
    payments: &[Payment],
) -> String {
    let mut body = format!(
        "<p>{address}</p>\n<h2>Vehículos</h2>\n<table>\n\
         <tr><th>Placa</th><th>Marca</th><th>Modelo</th><th>Control</th></tr>\n",
        address = escape(&neighbor.address),
    );
    for v in vehicles {
        body.push_str(&format!(
            "<tr><td>{plate}</td><td>{make}</td><td>{model}</td><td>{control}</td></tr>\n",
            plate = escape(&v.license_plate),
            make = escape(&v.make),
            model = escape(&v.model),
            control = escape(&v.control_number),
        ));
    }
    body.push_str(
        "</table>\n<h2>Pagos</h2>\n<table>\n\
         <tr><th>Fecha</th><th>Método</th><th>Monto</th><th>Recibo</th></tr>\n",
    );
    for p in payments {
        body.push_str(&format!(
            "<tr><td>{created}</td><td>{method}</td><td>{amount}</td><td>{receipt}</td></tr>\n",
            created = format_datetime(&p.created_at),
            method = escape(&p.method),
            amount = format_currency(p.amount),
            receipt = if p.receipt_file.is_some() {
                "Sí"
            } else {
                "&mdash;"
            },
        ));
    }
    body.push_str("</table>\n<p><a href=\"/portal\">Volver a la búsqueda</a></p>\n");

    layout(&neighbor.full_name(), flash, &body)
}

// ============================================================================
// Error pages
// ============================================================================

pub fn not_found_page() -> String {
    layout(
        "Página no encontrada",
        None,
        "<p>La página solicitada no existe.</p>\n<p><a href=\"/\">Volver al inicio</a></p>",
    )
}

pub fn internal_error_page() -> String {
    layout(
        "Error interno",
        None,
        "<p>Ocurrió un error inesperado. Intenta de nuevo más tarde.</p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(id: i64, first: &str, last: &str, address: &str) -> Neighbor {
        Neighbor {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            address: address.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>\"a\" & 'b'</script>"),
            "&lt;script&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/script&gt;"
        );
        assert_eq!(escape("Pérez"), "Pérez");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(150.0), "$150.00");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-42.1), "-$42.10");
    }

    #[test]
    fn test_format_datetime() {
        let dt = DateTime::parse_from_rfc3339("2024-12-31T13:45:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_datetime(&dt), "31/12/2024 13:45");
    }

    #[test]
    fn test_dashboard_escapes_user_data() {
        let rows = vec![NeighborSummary {
            neighbor: neighbor(1, "Ana<b>", "Pérez", "Calle & 1"),
            vehicle_count: 2,
            payment_count: 1,
        }];
        let html = dashboard_page(None, &rows);
        assert!(html.contains("Ana&lt;b&gt; Pérez"));
        assert!(html.contains("Calle &amp; 1"));
        assert!(!html.contains("Ana<b>"));
    }

    #[test]
    fn test_payments_page_formats_amount() {
        let n = neighbor(1, "Ana", "Pérez", "Calle 1");
        let payments = vec![Payment {
            id: 7,
            neighbor_id: 1,
            method: "efectivo".to_string(),
            amount: 1500.0,
            deposit_account: None,
            receipt_file: Some("r1.png".to_string()),
            created_at: Utc::now(),
        }];
        let html = payments_page(None, &n, &payments);
        assert!(html.contains("$1,500.00"));
        assert!(html.contains("/uploads/r1.png"));
        assert!(html.contains("/admin/users/1/payments/7/delete"));
    }

    #[test]
    fn test_portal_search_empty_query_shows_no_table() {
        let html = portal_search_page(None, "", &[]);
        assert!(!html.contains("Sin resultados"));

        let html = portal_search_page(None, "zzz", &[]);
        assert!(html.contains("Sin resultados"));
    }

    #[test]
    fn test_flash_banner_rendered() {
        let flash = Flash::error("Todos los campos son obligatorios");
        let html = users_page(Some(&flash), &[]);
        assert!(html.contains("flash error"));
        assert!(html.contains("Todos los campos son obligatorios"));
    }
}
