// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认/回退）和中文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 已加载的语言列表
pub fn available_locales() -> Vec<String> {
    rust_i18n::available_locales!()
        .into_iter()
        .map(|l| l.to_string())
        .collect()
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use survey_csv_import::i18n::t;
/// let msg = t("import.failed_try_again");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符形如 %{name}）
///
/// # 示例
/// ```no_run
/// use survey_csv_import::i18n::t_with_args;
/// let msg = t_with_args("import.missing_columns", &[("columns", "ALIAS, SEX")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter().fold(t(key), |message, (name, value)| {
        message.replace(&format!("%{{{}}}", name), value)
    })
}

// rust-i18n 的 locale 为全局状态，测试默认并行执行，这里串行化
#[cfg(test)]
pub(crate) static LOCALE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");

        set_locale("en");
        assert_eq!(current_locale(), "en");
    }

    #[test]
    fn test_locales_loaded() {
        let locales = available_locales();
        assert!(locales.contains(&"en".to_string()));
        assert!(locales.contains(&"zh-CN".to_string()));
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(t("import.empty_worksheet"), "The file has a header row but no data rows.");

        set_locale("zh-CN");
        assert_eq!(t("import.empty_worksheet"), "文件只有表头行，没有数据行。");

        set_locale("en");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("import.missing_columns", &[("columns", "ALIAS, SEX")]);
        assert!(msg.contains("ALIAS, SEX"));
        assert!(msg.contains("missing required columns"));

        set_locale("zh-CN");
        let msg = t_with_args("import.invalid_rows", &[("count", "3")]);
        assert!(msg.contains("3 个问题"));

        set_locale("en");
    }
}
