//! Server-rendered HTML pages.
//!
//! Every user-supplied string passes through [`escape`] before it reaches the
//! page; uhids placed in URLs are percent-encoded with `urlencoding`.

use std::fmt::Write;

use axum::http::StatusCode;
use patient_records_core::{Patient, PatientPage};

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;max-width:64rem}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:.4rem;text-align:left}\
nav a{margin-right:1rem}form.inline{display:inline}\
label{display:block;margin:.5rem 0}.error{color:#a00}";

/// Which submission a patient form posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    New,
    FollowUp,
    Edit,
}

impl FormKind {
    fn heading(self) -> &'static str {
        match self {
            FormKind::New => "New Patient",
            FormKind::FollowUp => "Follow-Up Visit",
            FormKind::Edit => "Edit Patient",
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Link to a page of the patient list, keeping the active search text.
pub fn list_href(text: Option<&str>, page: u32) -> String {
    let page = page.to_string();
    let mut pairs = Vec::with_capacity(2);
    if let Some(text) = text {
        pairs.push(("search", text));
    }
    pairs.push(("page", page.as_str()));

    match serde_urlencoded::to_string(&pairs) {
        Ok(query) => format!("/patients?{query}"),
        Err(_) => format!("/patients?page={page}"),
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <nav><a href=\"/\">Home</a><a href=\"/new\">New Patient</a>\
         <a href=\"/followup\">Follow-Up</a><a href=\"/patients\">Patients</a></nav>\n\
         {body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

pub fn home(consultants: &str) -> String {
    layout(
        "Patient Records",
        &format!(
            "<h1>Patient Records</h1>\n<p>Consultants: {}</p>",
            escape(consultants)
        ),
    )
}

/// Intake, follow-up or edit form, pre-filled from `patient` when given.
pub fn patient_form(kind: FormKind, patient: Option<&Patient>) -> String {
    let action = match (kind, patient) {
        (FormKind::Edit, Some(p)) => format!("/patients/{}/edit", urlencoding::encode(&p.uhid)),
        (FormKind::FollowUp, _) => "/followup".to_string(),
        _ => "/new".to_string(),
    };

    let value = |field: Option<&str>| escape(field.unwrap_or_default());
    let uhid = value(patient.map(|p| p.uhid.as_str()));
    let name = value(patient.map(|p| p.name.as_str()));
    let age = patient.map(|p| p.age.to_string()).unwrap_or_default();
    let sex = patient.map(|p| p.sex.as_str()).unwrap_or_default();
    let remarks = value(patient.and_then(|p| p.remarks.as_deref()));
    let diagnosis = value(patient.and_then(|p| p.diagnosis.as_deref()));
    let follow_up = patient
        .and_then(|p| p.follow_up_date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let uhid_input = if kind == FormKind::Edit {
        format!("<input name=\"uhid\" value=\"{uhid}\" readonly>")
    } else {
        format!("<input name=\"uhid\" value=\"{uhid}\" required>")
    };

    let mut sex_options = String::new();
    for option in ["", "M", "F", "Other"] {
        let selected = if option == sex { " selected" } else { "" };
        let _ = write!(
            sex_options,
            "<option value=\"{o}\"{selected}>{o}</option>",
            o = escape(option)
        );
    }
    if !sex.is_empty() && !["M", "F", "Other"].contains(&sex) {
        let _ = write!(
            sex_options,
            "<option value=\"{s}\" selected>{s}</option>",
            s = escape(sex)
        );
    }

    // Edit leaves the scheduled follow-up alone
    let follow_up_input = match kind {
        FormKind::Edit => String::new(),
        FormKind::FollowUp => format!(
            "<label>Follow-up date <input type=\"date\" name=\"follow_up_date\" value=\"{follow_up}\" required></label>"
        ),
        FormKind::New => format!(
            "<label>Follow-up date <input type=\"date\" name=\"follow_up_date\" value=\"{follow_up}\"></label>"
        ),
    };

    let body = format!(
        "<h1>{heading}</h1>\n<form method=\"post\" action=\"{action}\">\n\
         <label>UHID {uhid_input}</label>\n\
         <label>Name <input name=\"name\" value=\"{name}\" required></label>\n\
         <label>Age <input type=\"number\" min=\"0\" name=\"age\" value=\"{age}\" required></label>\n\
         <label>Sex <select name=\"sex\" required>{sex_options}</select></label>\n\
         <label>Remarks <textarea name=\"remarks\">{remarks}</textarea></label>\n\
         <label>Diagnosis <input name=\"diagnosis\" value=\"{diagnosis}\"></label>\n\
         {follow_up_input}\n\
         <button type=\"submit\">Save</button>\n</form>",
        heading = kind.heading(),
    );
    layout(kind.heading(), &body)
}

pub fn patient_list(page: &PatientPage) -> String {
    let text = page.text.as_deref();
    let mut body = String::new();

    let _ = write!(
        body,
        "<h1>Patients</h1>\n<form method=\"get\" action=\"/patients\">\
         <input name=\"search\" value=\"{}\" placeholder=\"Name or UHID\">\
         <button type=\"submit\">Search</button></form>\n",
        escape(text.unwrap_or_default())
    );

    if page.patients.is_empty() {
        body.push_str("<p>No patients found.</p>\n");
    } else {
        body.push_str(
            "<table>\n<tr><th>UHID</th><th>Name</th><th>Age</th><th>Sex</th>\
             <th>Remarks</th><th>Diagnosis</th><th>Follow-up</th><th></th></tr>\n",
        );
        for patient in &page.patients {
            let key = urlencoding::encode(&patient.uhid);
            let _ = write!(
                body,
                "<tr><td>{uhid}</td><td>{name}</td><td>{age}</td><td>{sex}</td>\
                 <td>{remarks}</td><td>{diagnosis}</td><td>{follow_up}</td>\
                 <td><a href=\"/patients/{key}/edit\">Edit</a> \
                 <form class=\"inline\" method=\"post\" action=\"/patients/{key}/delete\">\
                 <button type=\"submit\">Delete</button></form></td></tr>\n",
                uhid = escape(&patient.uhid),
                name = escape(&patient.name),
                age = patient.age,
                sex = escape(&patient.sex),
                remarks = escape(patient.remarks.as_deref().unwrap_or_default()),
                diagnosis = escape(patient.diagnosis.as_deref().unwrap_or_default()),
                follow_up = patient
                    .follow_up_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            );
        }
        body.push_str("</table>\n");
    }

    let _ = write!(
        body,
        "<p>{} patient(s), page {} of {}</p>\n<nav>",
        page.total_count,
        page.page,
        page.total_pages().max(1)
    );
    if page.has_previous() {
        let _ = write!(
            body,
            "<a href=\"{}\">Previous</a>",
            escape(&list_href(text, page.page - 1))
        );
    }
    if page.has_next() {
        let _ = write!(
            body,
            "<a href=\"{}\">Next</a>",
            escape(&list_href(text, page.page + 1))
        );
    }
    body.push_str("</nav>");

    layout("Patients", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    layout(
        status.canonical_reason().unwrap_or("Error"),
        &format!(
            "<h1>{}</h1>\n<p class=\"error\">{}</p>\n<p><a href=\"javascript:history.back()\">Go back</a></p>",
            status.as_u16(),
            escape(message)
        ),
    )
}
