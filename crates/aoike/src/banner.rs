//! Startup banner printed by `aoike dev`.

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{}{}{}", code, text, RESET)
    } else {
        text.to_string()
    }
}

/// Render the banner for `name` served at `url`.
pub fn render(name: &str, url: &str, color: bool) -> String {
    format!(
        "\n  {}\n\n{} > {}\n\n",
        paint(name, BOLD, color),
        paint("  Preview   ", DIM, color),
        paint(url, CYAN, color)
    )
}

/// Write the banner to stdout.
pub fn print(name: &str, url: &str, color: bool) {
    print!("{}", render(name, url, color));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_plain_banner() {
        let banner = render("Aoike", "http://localhost:5173/", false);

        assert_eq!(
            banner,
            "\n  Aoike\n\n  Preview    > http://localhost:5173/\n\n"
        );
        assert!(!banner.contains('\x1b'));
    }

    #[test]
    fn renders_colored_banner() {
        let banner = render("Aoike", "http://localhost:5173/", true);

        assert!(banner.contains("\x1b[1mAoike\x1b[0m"));
        assert!(banner.contains("\x1b[2m  Preview   \x1b[0m"));
        assert!(banner.contains("\x1b[36mhttp://localhost:5173/\x1b[0m"));
    }
}
