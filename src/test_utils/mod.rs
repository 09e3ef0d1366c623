#![allow(missing_docs)]

pub(crate) mod db;
pub(crate) mod form;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use db::{get_test_connection, shared_connection, test_storage};
pub(crate) use form::{
    assert_form_input, assert_form_input_value, assert_form_submit_button, assert_form_textarea,
    assert_hx_endpoint, assert_optional_form_input, get_form_select, must_get_form,
};
pub(crate) use html::{
    assert_valid_html, parse_html_document, parse_html_fragment, select_text, table_rows,
};
pub(crate) use http::{assert_content_type, assert_hx_redirect, get_header};
