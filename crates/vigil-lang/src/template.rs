/// Substitutes `{name}` placeholders. Placeholders without a binding
/// are left in place so a wording bug stays visible instead of
/// silently vanishing.
pub fn render_template(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in bindings {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}
