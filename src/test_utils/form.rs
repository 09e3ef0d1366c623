use scraper::{ElementRef, Html, Selector};

fn find_field<'a>(form: &ElementRef<'a>, tag: &str, name: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&format!("{tag}[name=\"{name}\"]")).unwrap();
    form.select(&selector).next()
}

#[track_caller]
pub(crate) fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

#[track_caller]
pub(crate) fn assert_hx_endpoint(form: &ElementRef<'_>, endpoint: &str, attribute: &str) {
    let value = form
        .value()
        .attr(attribute)
        .unwrap_or_else(|| panic!("{attribute} attribute missing"));

    assert_eq!(
        value, endpoint,
        "want form with attribute {attribute}=\"{endpoint}\", got {value:?}"
    );
}

/// Assert that `form` has a required input named `name` of type `type_`.
#[track_caller]
pub(crate) fn assert_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let input = find_field(form, "input", name)
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));
    let input_type = input.value().attr("type").unwrap_or_default();

    assert_eq!(
        input_type, type_,
        "want input {name} with type \"{type_}\", got {input_type:?}"
    );
    assert!(
        input.value().attr("required").is_some(),
        "want input with name {name} to have the required attribute but got none"
    );
}

/// Assert that `form` has an input named `name` of type `type_` that may be left empty.
#[track_caller]
pub(crate) fn assert_optional_form_input(form: &ElementRef<'_>, name: &str, type_: &str) {
    let input = find_field(form, "input", name)
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));
    let input_type = input.value().attr("type").unwrap_or_default();

    assert_eq!(
        input_type, type_,
        "want input {name} with type \"{type_}\", got {input_type:?}"
    );
    assert!(
        input.value().attr("required").is_none(),
        "want input with name {name} to be optional but it is required"
    );
}

#[track_caller]
pub(crate) fn assert_form_input_value(form: &ElementRef<'_>, name: &str, value: &str) {
    let input = find_field(form, "input", name)
        .unwrap_or_else(|| panic!("No input found with name \"{name}\""));
    let got = input.value().attr("value").unwrap_or_default();

    assert_eq!(got, value, "want input {name} with value \"{value}\", got {got:?}");
}

#[track_caller]
pub(crate) fn assert_form_textarea(form: &ElementRef<'_>, name: &str, content: &str) {
    let textarea = find_field(form, "textarea", name)
        .unwrap_or_else(|| panic!("No textarea found with name \"{name}\""));
    let got = textarea.text().collect::<String>();

    assert_eq!(got.trim(), content);
}

/// Assert that `form` has a select named `name` and return its option
/// values with the value of the selected option.
#[track_caller]
pub(crate) fn get_form_select(form: &ElementRef<'_>, name: &str) -> (Vec<String>, Option<String>) {
    let select = find_field(form, "select", name)
        .unwrap_or_else(|| panic!("No select found with name \"{name}\""));
    let option_selector = Selector::parse("option").unwrap();

    let mut values = Vec::new();
    let mut selected = None;
    for option in select.select(&option_selector) {
        let value = option.value().attr("value").unwrap_or_default().to_owned();
        if option.value().attr("selected").is_some() {
            selected = Some(value.clone());
        }
        values.push(value);
    }

    (values, selected)
}

#[track_caller]
pub(crate) fn assert_form_submit_button(form: &ElementRef<'_>) {
    let submit_button = form
        .select(&Selector::parse("button[type=\"submit\"]").unwrap())
        .next()
        .expect("No submit button found");

    assert!(
        !submit_button.text().collect::<String>().trim().is_empty(),
        "want submit button with a label"
    );
}
