//! Shared HTML building blocks and styles for the maud templates.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use rust_decimal::Decimal;

// Link styles
pub const LINK_STYLE: &str = "text-blue-600 hover:text-blue-500 \
    dark:text-blue-500 dark:hover:text-blue-400 underline";

// Button styles
pub const BUTTON_PRIMARY_STYLE: &str = "w-full px-4 py-2 bg-blue-500
    dark:bg-blue-600 disabled:bg-blue-700 hover:enabled:bg-blue-600 \
    hover:enabled:dark:bg-blue-700 text-white rounded";

pub const BUTTON_SECONDARY_STYLE: &str = "px-4 py-2 text-sm font-medium \
    text-gray-900 bg-white rounded border border-gray-200 hover:bg-gray-100 \
    hover:text-blue-700 dark:bg-gray-800 dark:text-gray-400 \
    dark:border-gray-600 dark:hover:text-white dark:hover:bg-gray-700";

pub const BUTTON_DELETE_STYLE: &str = "text-red-600 hover:text-red-500 \
    dark:text-red-500 dark:hover:text-red-400 underline bg-transparent \
    border-none cursor-pointer";

// Form styles
pub const FORM_CONTAINER_STYLE: &str = "flex flex-col items-center px-6 py-8 \
    mx-auto lg:py-0 max-w-md text-gray-900 dark:text-white";
pub const FORM_LABEL_STYLE: &str = "block mb-2 text-sm font-medium text-gray-900 dark:text-white";
pub const FORM_TEXT_INPUT_STYLE: &str = "block w-full p-2.5 rounded text-sm \
    text-gray-900 dark:text-white disabled:text-gray-500 bg-gray-50 \
    dark:bg-gray-700 border border-gray-300 dark:border-gray-600 \
    dark:placeholder-gray-400 focus:ring-blue-600 focus:border-blue-600 \
    focus:dark:border-blue-500 focus:dark:ring-blue-500";
pub const FORM_HELP_STYLE: &str = "mt-1 text-xs text-gray-500 dark:text-gray-400";

// Table styles
pub const TABLE_STYLE: &str = "w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400";

pub const TABLE_HEADER_STYLE: &str = "text-xs text-gray-700 uppercase \
    bg-gray-50 dark:bg-gray-700 dark:text-gray-400";

pub const TABLE_ROW_STYLE: &str = "bg-white border-b dark:bg-gray-800 dark:border-gray-700";

pub const TABLE_CELL_STYLE: &str = "px-6 py-4";

pub const TABLE_EMPTY_CELL_STYLE: &str = "px-6 py-4 text-center text-gray-500 dark:text-gray-400";

// Badge style, e.g. for roles and transaction types
pub const BADGE_STYLE: &str = "inline-flex items-center px-2.5 py-0.5 \
    text-xs font-semibold text-blue-800 bg-blue-100 rounded-full \
    dark:bg-blue-900 dark:text-blue-300";

// Page container
pub const PAGE_CONTAINER_STYLE: &str =
    "flex flex-col items-center px-6 py-8 mx-auto lg:py-5 text-gray-900 dark:text-white";

pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    #[allow(dead_code)]
    ScriptLink(String),
    #[allow(dead_code)]
    /// CSS source code.
    Style(PreEscaped<String>),
}

pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Statement Keeper" }
                link rel="icon" type="image/svg+xml" href="/static/favicon.svg";
                link href="/static/main.css" rel="stylesheet";

                script src="/static/htmx-2.0.8-min.js" integrity="sha384-/TgkGk7p307TH7EXJDuUlgG3Ce1UVolAOFopFekQkkXihi5u/6OCvVKyz1W+idaz" {}
                script src="/static/htmx-ext-response-targets-2.0.4.js" integrity="sha384-T41oglUPvXLGBVyRdZsVRxNWnOOqCynaPubjUVjxhsjFTKrFJGEMm3/0KGmNQ+Pg" {}

                style
                {
                    r#"
                    #indicator.htmx-indicator {
                        display: none;
                    }

                    #indicator.htmx-request .htmx-indicator {
                        display: inline;
                    }

                    #indicator.htmx-request.htmx-indicator {
                        display: inline;
                    }
                    "#
                }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptLink(path) => script src=(path) {}
                        HeadElement::Style(text) => style { (text) }
                    }
                }

                script src="/static/app.js" defer {}
            }

            body
                hx-ext="response-targets"
                class="container max-w-full min-h-screen bg-gray-50 dark:bg-gray-900"
            {
                (content)

                // Alert container for error responses
                div
                    id="alert-container"
                    class="w-full max-w-md px-4"
                    style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
                {}
            }
        }
    }
}

pub fn error_view(title: &str, header: &str, description: &str, fix: &str) -> Markup {
    // Template adapted from https://flowbite.com/blocks/marketing/404/
    let content = html!(
        section class="bg-white dark:bg-gray-900"
        {
            div class="py-8 px-4 mx-auto max-w-screen-xl lg:py-16 lg:px-6"
            {
                div class="mx-auto max-w-screen-sm text-center"
                {
                    h1
                        class="mb-4 text-7xl tracking-tight font-extrabold
                            lg:text-9xl text-blue-600 dark:text-blue-500"
                    {
                        (header)
                    }

                    p
                        class="mb-4 text-3xl md:text-4xl tracking-tight
                            font-bold text-gray-900 dark:text-white"
                    {
                        (description)
                    }

                    p
                        class="mb-4 text-1xl md:text-2xl tracking-tight
                            text-gray-900 dark:text-white"
                    {
                        (fix)
                    }

                    a
                        href="/"
                        class="inline-flex text-white bg-blue-600
                            hover:bg-blue-800 focus:ring-4 focus:outline-hidden
                            focus:ring-blue-300 font-medium rounded text-sm px-5
                            py-2.5 text-center dark:focus:ring-blue-900 my-4"
                    {
                        "Back to Homepage"
                    }
                }
            }
        }
    );

    base(title, &[], &content)
}

pub fn loading_spinner() -> Markup {
    // Spinner SVG adapted from https://flowbite.com/docs/components/spinner/
    html! {
        svg
            aria-hidden="true"
            role="status"
            class="inline text-white w-4 h-4 me-2 mb-1 animate-spin"
            viewBox="0 0 100 101"
            fill="none"
            xmlns="http://www.w3.org/2000/svg"
        {
            path
                d="M100 50.5908C100 78.2051 77.6142 100.591 50 100.591C22.3858 100.591 0 78.2051 0 50.5908C0 22.9766 22.3858 0.59082 50 0.59082C77.6142 0.59082 100 22.9766 100 50.5908ZM9.08144 50.5908C9.08144 73.1895 27.4013 91.5094 50 91.5094C72.5987 91.5094 90.9186 73.1895 90.9186 50.5908C90.9186 27.9921 72.5987 9.67226 50 9.67226C27.4013 9.67226 9.08144 27.9921 9.08144 50.5908Z"
                fill="#E5E7EB" {}
            path
                d="M93.9676 39.0409C96.393 38.4038 97.8624 35.9116 97.0079 33.5539C95.2932 28.8227 92.871 24.3692 89.8167 20.348C85.8452 15.1192 80.8826 10.7238 75.2124 7.41289C69.5422 4.10194 63.2754 1.94025 56.7698 1.05124C51.7666 0.367541 46.6976 0.446843 41.7345 1.27873C39.2613 1.69328 37.813 4.19778 38.4501 6.62326C39.0873 9.04874 41.5694 10.4717 44.0505 10.1071C47.8511 9.54855 51.7191 9.52689 55.5402 10.0491C60.8642 10.7766 65.9928 12.5457 70.6331 15.2552C75.2735 17.9648 79.3347 21.5619 82.5849 25.841C84.9175 28.9121 86.7997 32.2913 88.1811 35.8758C89.083 38.2158 91.5421 39.6781 93.9676 39.0409Z"
                fill="currentColor" {}
        }
    }
}

/// A labelled form field wrapper.
pub fn form_field(name: &str, label: &str, input: Markup, help: Option<&str>) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            (input)

            @if let Some(help) = help {
                p class=(FORM_HELP_STYLE) { (help) }
            }
        }
    }
}

/// A link to an edit page next to a button that deletes the resource via HTMX.
///
/// `hx_target` and `hx_swap` control which element is removed once the
/// delete request succeeds.
pub fn edit_delete_action_links(
    edit_url: &str,
    delete_url: &str,
    confirm_message: &str,
    hx_target: &str,
    hx_swap: &str,
) -> Markup {
    html! {
        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

        (delete_action_link(delete_url, confirm_message, hx_target, hx_swap))
    }
}

/// A button that deletes the resource at `delete_url` via HTMX after asking
/// for confirmation.
pub fn delete_action_link(
    delete_url: &str,
    confirm_message: &str,
    hx_target: &str,
    hx_swap: &str,
) -> Markup {
    html! {
        button
            type="button"
            hx-delete=(delete_url)
            hx-confirm=(confirm_message)
            hx-target=(hx_target)
            hx-target-error="#alert-container"
            hx-swap=(hx_swap)
            class=(BUTTON_DELETE_STYLE)
        {
            "Delete"
        }
    }
}

/// Trim an optional form value, treating blank text as missing.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Format `amount` with two decimal places and thousands separators, e.g.
/// "-1,234.50".
pub fn format_amount(amount: Decimal) -> String {
    let rounded = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", rounded.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    format!("{sign}{}.{fraction}", group_thousands(whole))
}

/// Format an amount with its currency code, e.g. "USD 1,234.50".
pub fn format_amount_with_currency(amount: Decimal, currency: &str) -> String {
    format!("{} {}", currency.to_uppercase(), format_amount(amount))
}

/// Format a count with thousands separators, e.g. "12,345".
pub fn format_count(count: u32) -> String {
    group_thousands(&count.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

#[cfg(test)]
mod format_tests {
    use rust_decimal_macros::dec;

    use super::{format_amount, format_amount_with_currency, format_count, optional_text};

    #[test]
    fn optional_text_drops_blank_values() {
        assert_eq!(optional_text(None), None);
        assert_eq!(optional_text(Some("  \t".to_owned())), None);
        assert_eq!(optional_text(Some(" Bank ".to_owned())), Some("Bank".to_owned()));
    }

    #[test]
    fn formats_small_amount() {
        assert_eq!(format_amount(dec!(12.3)), "12.30");
    }

    #[test]
    fn formats_thousands() {
        assert_eq!(format_amount(dec!(1234567.891)), "1,234,567.89");
    }

    #[test]
    fn formats_negative_amount() {
        assert_eq!(format_amount(dec!(-1050)), "-1,050.00");
    }

    #[test]
    fn formats_zero() {
        assert_eq!(format_amount(dec!(0)), "0.00");
    }

    #[test]
    fn formats_with_currency() {
        assert_eq!(
            format_amount_with_currency(dec!(105.48), "usd"),
            "USD 105.48"
        );
    }

    #[test]
    fn formats_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(123456), "123,456");
    }
}
