/// Scroll the first anchor whose visible text contains the argument into view
pub const SCROLL_TO_LINK_JS: &str = r#"
        (text) => {
            const link = Array.from(document.querySelectorAll('a'))
                .find(a => (a.innerText || '').trim().includes(text));
            if (!link) {
                return false;
            }
            link.scrollIntoView(true);
            return true;
        }
    "#;

pub const CLICK_LINK_JS: &str = r#"
        (text) => {
            const link = Array.from(document.querySelectorAll('a'))
                .find(a => (a.innerText || '').trim().includes(text));
            if (!link) {
                return false;
            }
            link.click();
            return true;
        }
    "#;

pub const XPATH_EXISTS_JS: &str = r#"
        (xpath) => {
            const node = document.evaluate(xpath, document, null,
                XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            return node !== null;
        }
    "#;

/// Clears and types into the input, firing the events ASP.NET forms listen for
pub const FILL_INPUT_JS: &str = r#"
        (xpath, value) => {
            const input = document.evaluate(xpath, document, null,
                XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            if (!input) {
                return false;
            }
            input.focus();
            input.value = '';
            input.value = value;
            input.dispatchEvent(new Event('input', { bubbles: true }));
            input.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }
    "#;

pub const CLICK_XPATH_JS: &str = r#"
        (xpath) => {
            const el = document.evaluate(xpath, document, null,
                XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
            if (!el) {
                return false;
            }
            el.click();
            return true;
        }
    "#;

/// `({fn})({args})` with every argument JSON-encoded
pub fn invoke(function: &str, args: &[&str]) -> String {
    let encoded: Vec<String> = args
        .iter()
        .map(|a| serde_json::to_string(a).unwrap_or_else(|_| "\"\"".to_string()))
        .collect();
    format!("({})({})", function.trim(), encoded.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_escapes_arguments() {
        let call = invoke(XPATH_EXISTS_JS, &["//input[@value='Get Result']"]);
        assert!(call.starts_with("((xpath) =>"));
        assert!(call.ends_with(r#"("//input[@value='Get Result']")"#));

        let call = invoke(FILL_INPUT_JS, &["//input[@type='text']", "21105124\"001"]);
        assert!(call.ends_with(r#"("//input[@type='text']", "21105124\"001")"#));
    }
}
