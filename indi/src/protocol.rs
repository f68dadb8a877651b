//! INDI XML Protocol definitions

/// INDI protocol version
pub const INDI_PROTOCOL_VERSION: &str = "1.7";

/// Build the `getProperties` request, optionally narrowed to one device/property
pub fn get_properties(device: Option<&str>, property: Option<&str>) -> String {
    let mut cmd = format!("<getProperties version=\"{}\"", INDI_PROTOCOL_VERSION);
    if let Some(device) = device {
        cmd.push_str(&format!(" device=\"{}\"", escape(device)));
    }
    if let Some(property) = property {
        cmd.push_str(&format!(" name=\"{}\"", escape(property)));
    }
    cmd.push_str("/>");
    cmd
}

/// Build a single-element `new*Vector` command
pub fn new_vector(kind: &str, device: &str, property: &str, element: &str, value: &str) -> String {
    format!(
        "<new{kind}Vector device=\"{}\" name=\"{}\">\
         <one{kind} name=\"{}\">{}</one{kind}>\
         </new{kind}Vector>",
        escape(device),
        escape(property),
        escape(element),
        escape(value),
    )
}

/// Minimal XML escaping for attribute and text content
pub fn escape(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}
