use crate::error::ShellError;

#[derive(Debug, Clone)]
pub struct Flags {
    flags: Vec<Flag>,
}

#[derive(Debug, Clone)]
pub struct Flag {
    pub name: &'static str,
    pub short: &'static str,
    pub long: &'static str,
    pub placeholder: Option<&'static str>,
    pub description: &'static str,
    pub value: Option<String>,
}

impl Flag {
    fn switch(name: &'static str, short: &'static str, long: &'static str, description: &'static str) -> Self {
        Flag {
            name,
            short,
            long,
            placeholder: None,
            description,
            value: None,
        }
    }

    fn valued(
        name: &'static str,
        short: &'static str,
        long: &'static str,
        placeholder: &'static str,
        description: &'static str,
    ) -> Self {
        Flag {
            placeholder: Some(placeholder),
            ..Flag::switch(name, short, long, description)
        }
    }

    fn matches(&self, arg: &str) -> bool {
        arg == self.short || arg == self.long
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

impl Flags {
    pub fn new() -> Self {
        let flags = vec![
            Flag::switch("help", "-h", "--help", "Print this help message"),
            Flag::switch("version", "-v", "--version", "Show version information"),
            Flag::valued("config", "-c", "--config", "<path>", "Read configuration from this file"),
            Flag::valued("data-dir", "-D", "--data-dir", "<path>", "Keep aliases and history in this directory"),
            Flag::switch("ephemeral", "-e", "--ephemeral", "Keep aliases and history in memory only"),
            Flag::switch("quiet", "-q", "--quiet", "Suppress the banner and warnings"),
            Flag::switch("debug", "-d", "--debug", "Enable debug logging"),
        ];

        Flags { flags }
    }

    pub fn parse(&mut self, args: &[String]) -> Result<(), ShellError> {
        let mut args = args.iter();
        while let Some(arg) = args.next() {
            let Some(flag) = self.flags.iter_mut().find(|f| f.matches(arg)) else {
                return Err(ShellError::Flag(format!("unknown flag {}", arg)));
            };

            flag.value = if flag.placeholder.is_some() {
                match args.next() {
                    Some(value) => Some(value.clone()),
                    None => return Err(ShellError::Flag(format!("flag {} requires a value", arg))),
                }
            } else {
                Some("true".to_string())
            };
        }
        Ok(())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get_value(name).is_some()
    }

    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_deref())
    }

    pub fn help(&self) -> String {
        let mut text = String::from("Usage: panelsh [OPTIONS]\n\nOptions:\n");
        for flag in &self.flags {
            let long = match flag.placeholder {
                Some(placeholder) => format!("{} {}", flag.long, placeholder),
                None => flag.long.to_string(),
            };
            text.push_str(&format!("  {}, {:<18} {}\n", flag.short, long, flag.description));
        }
        text
    }

    pub fn print_help(&self) {
        print!("{}", self.help());
    }
}
